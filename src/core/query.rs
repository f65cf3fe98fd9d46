//! Read-side projections and listing queries.
//!
//! Nothing here writes. Flags such as `is_featured` or `is_expired` are computed into
//! [`ListingView`] and [`VehicleAdStatus`] from the stored row and today's date; the
//! stored advertisement is never patched.

use crate::{
    core::{
        money, rules,
        status::AdStatus,
        user::Actor,
        vehicle::{self as catalog, VehicleDetail, image_refs},
    },
    entities::{Advertisement, Vehicle, advertisement, vehicle},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{Condition, QueryOrder, QuerySelect, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Largest page any list query returns.
pub const MAX_PAGE_LIMIT: u64 = 100;

const DEFAULT_PAGE_LIMIT: u64 = 20;

/// Offset pagination for the public lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Page {
    /// Rows to skip
    pub offset: u64,
    /// Rows to return, capped at [`MAX_PAGE_LIMIT`]
    pub limit: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Page {
    /// Effective limit: at least one row, at most [`MAX_PAGE_LIMIT`].
    #[must_use]
    pub fn effective_limit(&self) -> u64 {
        self.limit.clamp(1, MAX_PAGE_LIMIT)
    }
}

/// An advertisement joined with its vehicle, plus derived flags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingView {
    /// Stored advertisement, unchanged
    pub advertisement: advertisement::Model,
    /// Stored vehicle, unchanged
    pub vehicle: vehicle::Model,
    /// Parsed status
    pub status: AdStatus,
    /// Status is featured
    pub is_featured: bool,
    /// Open but past its expiration date
    pub is_expired: bool,
    /// Open and not expired
    pub is_active: bool,
    /// Vehicle price
    pub price: Decimal,
    /// Feature surcharge, if any
    pub featured_price: Option<Decimal>,
    /// Image references of the vehicle
    pub images: Vec<String>,
}

impl ListingView {
    /// Derives the view for `today`.
    pub fn project(
        advertisement: advertisement::Model,
        vehicle: vehicle::Model,
        today: NaiveDate,
    ) -> Result<Self> {
        let status = rules::parse_status(&advertisement)?;
        let is_expired = rules::is_expired(status, advertisement.expiration_date, today);
        Ok(Self {
            status,
            is_featured: status == AdStatus::Featured,
            is_expired,
            is_active: status.is_open() && !is_expired,
            price: money::from_cents(vehicle.price_cents),
            featured_price: advertisement.featured_price_cents.map(money::from_cents),
            images: image_refs(&vehicle),
            advertisement,
            vehicle,
        })
    }
}

/// Listing status of a single vehicle, as shown next to the vehicle itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleAdStatus {
    /// Advertisement id, if the vehicle is listed
    pub ad_id: Option<i64>,
    /// Stored status, or `no_ad`
    pub status: String,
    /// Open and not expired
    pub has_active_ad: bool,
    /// Status is featured
    pub is_featured: bool,
    /// Status is sold
    pub is_sold: bool,
    /// Open but past its expiration date
    pub is_expired: bool,
    /// Last day the listing is shown
    pub expiration_date: Option<NaiveDate>,
    /// Buyer, once sold
    pub buyer_id: Option<i64>,
    /// Day of the sale
    pub sale_date: Option<NaiveDate>,
}

impl VehicleAdStatus {
    /// Status reported for a vehicle without an advertisement.
    pub const NO_AD: &'static str = "no_ad";

    /// Derives the status view from an optional advertisement.
    pub fn project(ad: Option<&advertisement::Model>, today: NaiveDate) -> Result<Self> {
        let Some(ad) = ad else {
            return Ok(Self {
                ad_id: None,
                status: Self::NO_AD.to_string(),
                has_active_ad: false,
                is_featured: false,
                is_sold: false,
                is_expired: false,
                expiration_date: None,
                buyer_id: None,
                sale_date: None,
            });
        };

        let status = rules::parse_status(ad)?;
        let is_expired = rules::is_expired(status, ad.expiration_date, today);
        Ok(Self {
            ad_id: Some(ad.id),
            status: status.as_str().to_string(),
            has_active_ad: status.is_open() && !is_expired,
            is_featured: status == AdStatus::Featured,
            is_sold: status == AdStatus::Sold,
            is_expired,
            expiration_date: Some(ad.expiration_date),
            buyer_id: ad.buyer_id,
            sale_date: ad.sale_date,
        })
    }
}

/// Filters for [`search_vehicles`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchFilter {
    /// Substring of the make, case-insensitive
    pub make: Option<String>,
    /// Substring of the model name, case-insensitive
    pub model: Option<String>,
    /// Lowest price, inclusive
    pub min_price: Option<Decimal>,
    /// Highest price, inclusive
    pub max_price: Option<Decimal>,
}

type ListingRow = (advertisement::Model, Option<vehicle::Model>);

fn listings() -> sea_orm::SelectTwo<Advertisement, Vehicle> {
    Advertisement::find()
        .find_also_related(Vehicle)
        .filter(advertisement::Column::DeletedAt.is_null())
        .filter(vehicle::Column::DeletedAt.is_null())
}

fn into_views(rows: Vec<ListingRow>, today: NaiveDate) -> Result<Vec<ListingView>> {
    let mut views = Vec::with_capacity(rows.len());
    for (ad, vehicle) in rows {
        match vehicle {
            Some(vehicle) => views.push(ListingView::project(ad, vehicle, today)?),
            None => warn!("Advertisement {} has no vehicle, skipping", ad.id),
        }
    }
    Ok(views)
}

async fn fetch_page(
    db: &DatabaseConnection,
    condition: Condition,
    page: Page,
    today: NaiveDate,
) -> Result<Vec<ListingView>> {
    let rows = listings()
        .filter(condition)
        .order_by_desc(advertisement::Column::CreationDate)
        .order_by_desc(advertisement::Column::Id)
        .offset(page.offset)
        .limit(page.effective_limit())
        .all(db)
        .await?;
    debug!("Fetched {} listings", rows.len());
    into_views(rows, today)
}

fn open_and_live(today: NaiveDate) -> Condition {
    Condition::all()
        .add(advertisement::Column::Status.is_in(AdStatus::open_strings()))
        .add(advertisement::Column::ExpirationDate.gte(today))
}

/// Open listings that have not expired, newest first.
pub async fn list_active(
    db: &DatabaseConnection,
    page: Page,
    today: NaiveDate,
) -> Result<Vec<ListingView>> {
    fetch_page(db, open_and_live(today), page, today).await
}

/// Featured listings that have not expired, newest first.
pub async fn list_featured(
    db: &DatabaseConnection,
    page: Page,
    today: NaiveDate,
) -> Result<Vec<ListingView>> {
    let condition = Condition::all()
        .add(advertisement::Column::Status.eq(AdStatus::Featured.as_str()))
        .add(advertisement::Column::ExpirationDate.gte(today));
    fetch_page(db, condition, page, today).await
}

/// Sold listings, newest first.
pub async fn list_sold(
    db: &DatabaseConnection,
    page: Page,
    today: NaiveDate,
) -> Result<Vec<ListingView>> {
    let condition =
        Condition::all().add(advertisement::Column::Status.eq(AdStatus::Sold.as_str()));
    fetch_page(db, condition, page, today).await
}

/// The actor's own listings that are still open and not expired.
pub async fn list_mine(
    db: &DatabaseConnection,
    actor: &Actor,
    page: Page,
    today: NaiveDate,
) -> Result<Vec<ListingView>> {
    let condition = open_and_live(today).add(advertisement::Column::SellerId.eq(actor.id));
    fetch_page(db, condition, page, today).await
}

/// The actor's own listings that have been sold.
pub async fn list_my_sold(
    db: &DatabaseConnection,
    actor: &Actor,
    page: Page,
    today: NaiveDate,
) -> Result<Vec<ListingView>> {
    let condition = Condition::all()
        .add(advertisement::Column::Status.eq(AdStatus::Sold.as_str()))
        .add(advertisement::Column::SellerId.eq(actor.id));
    fetch_page(db, condition, page, today).await
}

/// Listings the actor bought.
pub async fn list_purchased(
    db: &DatabaseConnection,
    actor: &Actor,
    page: Page,
    today: NaiveDate,
) -> Result<Vec<ListingView>> {
    let condition = Condition::all()
        .add(advertisement::Column::Status.eq(AdStatus::Sold.as_str()))
        .add(advertisement::Column::BuyerId.eq(actor.id));
    fetch_page(db, condition, page, today).await
}

async fn find_view(db: &DatabaseConnection, ad_id: i64, today: NaiveDate) -> Result<ListingView> {
    let row = listings()
        .filter(advertisement::Column::Id.eq(ad_id))
        .one(db)
        .await?;
    match row {
        Some((ad, Some(vehicle))) => ListingView::project(ad, vehicle, today),
        Some((ad, None)) => Err(Error::NotFound {
            entity: "vehicle",
            id: ad.vehicle_id,
        }),
        None => Err(Error::NotFound {
            entity: "advertisement",
            id: ad_id,
        }),
    }
}

/// Public read of a listing.
///
/// Open listings are visible to anyone. A sold listing is a detail record and needs a
/// viewer who is its seller, its buyer or an administrator.
pub async fn get_listing(
    db: &DatabaseConnection,
    ad_id: i64,
    viewer: Option<&Actor>,
    today: NaiveDate,
) -> Result<ListingView> {
    let view = find_view(db, ad_id, today).await?;
    if view.status.is_open() {
        return Ok(view);
    }
    match viewer {
        Some(actor) => rules::ensure_can_view(&view.advertisement, actor)?,
        None => return Err(Error::unauthorized("sold listings are not public")),
    }
    Ok(view)
}

/// Detail record of a listing, visible to its seller, its buyer and administrators.
pub async fn get_listing_detail(
    db: &DatabaseConnection,
    ad_id: i64,
    actor: &Actor,
    today: NaiveDate,
) -> Result<ListingView> {
    let view = find_view(db, ad_id, today).await?;
    rules::ensure_can_view(&view.advertisement, actor)?;
    Ok(view)
}

/// Detail record of a sold listing. Open listings are reported as not found.
pub async fn get_sold_detail(
    db: &DatabaseConnection,
    ad_id: i64,
    actor: &Actor,
    today: NaiveDate,
) -> Result<ListingView> {
    let view = get_listing_detail(db, ad_id, actor, today).await?;
    if view.status != AdStatus::Sold {
        return Err(Error::NotFound {
            entity: "sold advertisement",
            id: ad_id,
        });
    }
    Ok(view)
}

/// Listing status of a vehicle.
pub async fn vehicle_ad_status(
    db: &DatabaseConnection,
    vehicle_id: i64,
    today: NaiveDate,
) -> Result<VehicleAdStatus> {
    catalog::get_vehicle(db, vehicle_id, today)
        .await
        .map(|detail| detail.ad_status)
}

/// Searches unsold vehicles by make, model and price range.
pub async fn search_vehicles(
    db: &DatabaseConnection,
    filter: &SearchFilter,
    today: NaiveDate,
) -> Result<Vec<VehicleDetail>> {
    let min_cents = filter.min_price.map(money::to_cents).transpose()?;
    let max_cents = filter.max_price.map(money::to_cents).transpose()?;
    if let (Some(min), Some(max)) = (min_cents, max_cents) {
        if min > max {
            return Err(Error::validation("min_price must not exceed max_price"));
        }
    }

    let mut query = Vehicle::find()
        .find_also_related(Advertisement)
        .filter(vehicle::Column::DeletedAt.is_null())
        .filter(
            Condition::any()
                .add(advertisement::Column::Id.is_null())
                .add(
                    Condition::all()
                        .add(advertisement::Column::DeletedAt.is_null())
                        .add(advertisement::Column::Status.ne(AdStatus::Sold.as_str())),
                ),
        );
    if let Some(make) = filter.make.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(vehicle::Column::Make.contains(make));
    }
    if let Some(model) = filter.model.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(vehicle::Column::ModelName.contains(model));
    }
    if let Some(min) = min_cents {
        query = query.filter(vehicle::Column::PriceCents.gte(min));
    }
    if let Some(max) = max_cents {
        query = query.filter(vehicle::Column::PriceCents.lte(max));
    }

    let rows = query
        .order_by_asc(vehicle::Column::PriceCents)
        .order_by_asc(vehicle::Column::Id)
        .limit(MAX_PAGE_LIMIT)
        .all(db)
        .await?;

    rows.into_iter()
        .map(|(vehicle, ad)| -> Result<VehicleDetail> {
            let ad_status = VehicleAdStatus::project(ad.as_ref(), today)?;
            Ok(VehicleDetail { vehicle, ad_status })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{listing, status::Role};
    use crate::test_utils::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn ids(views: &[ListingView]) -> Vec<i64> {
        views.iter().map(|v| v.advertisement.id).collect()
    }

    #[test]
    fn test_page_limit_is_capped() {
        assert_eq!(Page::default().effective_limit(), 20);
        assert_eq!(Page { offset: 0, limit: 0 }.effective_limit(), 1);
        assert_eq!(Page { offset: 0, limit: 5000 }.effective_limit(), MAX_PAGE_LIMIT);
    }

    #[tokio::test]
    async fn test_listing_view_flags() -> Result<()> {
        let market = setup_marketplace().await?;
        let created = create_test_listing(&market, dec!(18500.50)).await?;

        let view = ListingView::project(created.advertisement, created.vehicle, today())?;
        assert_eq!(view.status, AdStatus::Standard);
        assert!(view.is_active);
        assert!(!view.is_expired);
        assert!(!view.is_featured);
        assert_eq!(view.price, dec!(18500.50));
        assert_eq!(view.featured_price, None);
        assert_eq!(view.images, vec!["front.jpg", "interior.jpg"]);

        // Same row viewed after its last day
        let later = view.advertisement.expiration_date.succ_opt().unwrap();
        let expired = ListingView::project(view.advertisement, view.vehicle, later)?;
        assert!(expired.is_expired);
        assert!(!expired.is_active);
        assert_eq!(expired.status, AdStatus::Standard);

        Ok(())
    }

    #[test]
    fn test_vehicle_without_ad() {
        let status = VehicleAdStatus::project(None, today()).unwrap();
        assert_eq!(status.status, "no_ad");
        assert_eq!(status.ad_id, None);
        assert!(!status.has_active_ad);
    }

    #[tokio::test]
    async fn test_public_lists() -> Result<()> {
        let market = setup_marketplace().await?;
        let standard = create_test_listing(&market, dec!(10000)).await?;
        let featured = create_test_listing(&market, dec!(20000)).await?;
        let sold = create_test_listing(&market, dec!(30000)).await?;
        let expired = create_test_listing(&market, dec!(40000)).await?;

        let (standard_id, featured_id, sold_id, expired_id) = (
            standard.advertisement.id,
            featured.advertisement.id,
            sold.advertisement.id,
            expired.advertisement.id,
        );
        listing::feature_listing(&market.db, &market.settings, featured_id, &market.seller, None)
            .await?;
        listing::purchase_listing(&market.db, &market.settings, sold_id, &market.buyer, None)
            .await?;
        backdate_expiration(&market.db, expired_id, NaiveDate::from_ymd_opt(2020, 5, 1).unwrap())
            .await?;

        let active = list_active(&market.db, Page::default(), today()).await?;
        let mut active_ids = ids(&active);
        active_ids.sort_unstable();
        assert_eq!(active_ids, vec![standard_id, featured_id]);
        assert!(active.iter().all(|v| v.is_active));

        let featured_list = list_featured(&market.db, Page::default(), today()).await?;
        assert_eq!(ids(&featured_list), vec![featured_id]);
        assert_eq!(featured_list[0].featured_price, Some(dec!(30.00)));

        let sold_list = list_sold(&market.db, Page::default(), today()).await?;
        assert_eq!(ids(&sold_list), vec![sold_id]);

        // Expired rows keep their stored status
        let reread = listing::get_active_advertisement(&market.db, expired_id).await?;
        assert_eq!(reread.status, "standard");

        Ok(())
    }

    #[tokio::test]
    async fn test_pagination() -> Result<()> {
        let market = setup_marketplace().await?;
        for _ in 0..5 {
            create_test_listing(&market, dec!(1000)).await?;
        }

        let first = list_active(&market.db, Page { offset: 0, limit: 2 }, today()).await?;
        let second = list_active(&market.db, Page { offset: 2, limit: 2 }, today()).await?;
        let rest = list_active(&market.db, Page { offset: 4, limit: 2 }, today()).await?;

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert_eq!(rest.len(), 1);
        assert!(ids(&first).iter().all(|id| !ids(&second).contains(id)));

        Ok(())
    }

    #[tokio::test]
    async fn test_personal_lists() -> Result<()> {
        let market = setup_marketplace().await?;
        let kept = create_test_listing(&market, dec!(10000)).await?;
        let sold = create_test_listing(&market, dec!(12000)).await?;
        listing::purchase_listing(
            &market.db,
            &market.settings,
            sold.advertisement.id,
            &market.buyer,
            None,
        )
        .await?;

        let mine = list_mine(&market.db, &market.seller, Page::default(), today()).await?;
        assert_eq!(ids(&mine), vec![kept.advertisement.id]);

        let my_sold = list_my_sold(&market.db, &market.seller, Page::default(), today()).await?;
        assert_eq!(ids(&my_sold), vec![sold.advertisement.id]);

        let purchased =
            list_purchased(&market.db, &market.buyer, Page::default(), today()).await?;
        assert_eq!(ids(&purchased), vec![sold.advertisement.id]);

        let nothing = list_mine(&market.db, &market.buyer, Page::default(), today()).await?;
        assert!(nothing.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_detail_access() -> Result<()> {
        let market = setup_marketplace().await?;
        let stranger = create_test_actor(&market.db, "stranger", Role::Buyer).await?;
        let admin = create_test_actor(&market.db, "moderator", Role::Admin).await?;
        let created = create_test_listing(&market, dec!(15000)).await?;
        let ad_id = created.advertisement.id;

        // Open listings are public
        get_listing(&market.db, ad_id, None, today()).await?;
        // Detail records are not
        assert!(matches!(
            get_listing_detail(&market.db, ad_id, &stranger, today()).await,
            Err(Error::Authorization { .. })
        ));
        get_listing_detail(&market.db, ad_id, &market.seller, today()).await?;

        // Not sold yet
        assert!(matches!(
            get_sold_detail(&market.db, ad_id, &market.seller, today()).await,
            Err(Error::NotFound { .. })
        ));

        listing::purchase_listing(&market.db, &market.settings, ad_id, &market.buyer, None)
            .await?;

        assert!(matches!(
            get_listing(&market.db, ad_id, None, today()).await,
            Err(Error::Authorization { .. })
        ));
        assert!(matches!(
            get_sold_detail(&market.db, ad_id, &stranger, today()).await,
            Err(Error::Authorization { .. })
        ));
        for viewer in [&market.seller, &market.buyer, &admin] {
            let view = get_sold_detail(&market.db, ad_id, viewer, today()).await?;
            assert_eq!(view.advertisement.buyer_id, Some(market.buyer.id));
        }

        assert!(matches!(
            get_listing(&market.db, 777, None, today()).await,
            Err(Error::NotFound {
                entity: "advertisement",
                id: 777
            })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_vehicle_ad_status() -> Result<()> {
        let market = setup_marketplace().await?;
        let created = create_test_listing(&market, dec!(15000)).await?;
        let ad_id = created.advertisement.id;

        listing::feature_listing(&market.db, &market.settings, ad_id, &market.seller, None)
            .await?;
        let status = vehicle_ad_status(&market.db, created.vehicle.id, today()).await?;
        assert_eq!(status.status, "featured");
        assert!(status.is_featured);
        assert!(status.has_active_ad);
        assert!(!status.is_sold);

        listing::purchase_listing(&market.db, &market.settings, ad_id, &market.buyer, None)
            .await?;
        let status = vehicle_ad_status(&market.db, created.vehicle.id, today()).await?;
        assert_eq!(status.status, "sold");
        assert!(status.is_sold);
        assert!(!status.has_active_ad);
        assert_eq!(status.buyer_id, Some(market.buyer.id));
        assert_eq!(status.sale_date, Some(today()));

        Ok(())
    }

    #[tokio::test]
    async fn test_search_vehicles() -> Result<()> {
        let market = setup_marketplace().await?;
        let mut golf = sample_draft(dec!(9000));
        golf.make = "Volkswagen".to_string();
        golf.model = "Golf".to_string();
        let mut passat = sample_draft(dec!(15000));
        passat.make = "Volkswagen".to_string();
        passat.model = "Passat".to_string();
        let mut clio = sample_draft(dec!(6000));
        clio.make = "Renault".to_string();
        clio.model = "Clio".to_string();

        let golf = listing::create_listing(&market.db, &market.settings, golf, market.seller.id)
            .await?;
        let passat =
            listing::create_listing(&market.db, &market.settings, passat, market.seller.id)
                .await?;
        listing::create_listing(&market.db, &market.settings, clio, market.seller.id).await?;

        let filter = SearchFilter {
            make: Some("volks".to_string()),
            ..SearchFilter::default()
        };
        let found = search_vehicles(&market.db, &filter, today()).await?;
        let found_ids: Vec<i64> = found.iter().map(|d| d.vehicle.id).collect();
        assert_eq!(found_ids, vec![golf.vehicle.id, passat.vehicle.id]);

        let filter = SearchFilter {
            make: Some("Volkswagen".to_string()),
            max_price: Some(dec!(10000)),
            ..SearchFilter::default()
        };
        let found = search_vehicles(&market.db, &filter, today()).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].vehicle.model_name, "Golf");

        // Sold vehicles drop out of search
        listing::purchase_listing(
            &market.db,
            &market.settings,
            passat.advertisement.id,
            &market.buyer,
            None,
        )
        .await?;
        let filter = SearchFilter {
            model: Some("passat".to_string()),
            ..SearchFilter::default()
        };
        assert!(search_vehicles(&market.db, &filter, today()).await?.is_empty());

        let inverted = SearchFilter {
            min_price: Some(dec!(500)),
            max_price: Some(dec!(100)),
            ..SearchFilter::default()
        };
        assert!(matches!(
            search_vehicles(&market.db, &inverted, today()).await,
            Err(Error::Validation { .. })
        ));

        Ok(())
    }
}
