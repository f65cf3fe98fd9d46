//! Payment reporting over the ledger.
//!
//! Administrators see every payment and the revenue aggregates; any authenticated
//! actor may list the payments they made. Totals are summed in cents and converted to
//! [`Decimal`] only at the end, so no rounding creeps in.

use crate::{
    core::{money, rules, status::PaymentType, user::Actor},
    entities::{Payment, payment},
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{Condition, QueryOrder, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Date range and type filter shared by all reports. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaymentFilter {
    /// First day included
    pub start: Option<NaiveDate>,
    /// Last day included
    pub end: Option<NaiveDate>,
    /// Only payments of this type
    pub payment_type: Option<PaymentType>,
}

impl PaymentFilter {
    fn to_condition(self) -> Result<Condition> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(Error::validation(format!(
                    "start date {start} is after end date {end}"
                )));
            }
        }

        let mut condition = Condition::all();
        if let Some(start) = self.start {
            condition = condition.add(payment::Column::PaidAt.gte(start_of(start)));
        }
        if let Some(end) = self.end {
            // Exclusive upper bound on the following midnight
            let next = end.succ_opt().ok_or_else(|| {
                Error::validation(format!("end date {end} is out of range"))
            })?;
            condition = condition.add(payment::Column::PaidAt.lt(start_of(next)));
        }
        if let Some(payment_type) = self.payment_type {
            condition = condition.add(payment::Column::PaymentType.eq(payment_type.as_str()));
        }
        Ok(condition)
    }
}

fn start_of(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// A payment with its amount as a decimal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentView {
    /// Ledger id
    pub id: i64,
    /// Paying user
    pub payer_id: i64,
    /// Receiving user
    pub payee_id: i64,
    /// Related advertisement
    pub advertisement_id: Option<i64>,
    /// When the payment was made
    pub paid_at: DateTime<Utc>,
    /// Amount
    pub amount: Decimal,
    /// Stored payment type
    pub payment_type: String,
}

impl From<payment::Model> for PaymentView {
    fn from(model: payment::Model) -> Self {
        Self {
            id: model.id,
            payer_id: model.payer_id,
            payee_id: model.payee_id,
            advertisement_id: model.advertisement_id,
            paid_at: model.paid_at,
            amount: money::from_cents(model.amount_cents),
            payment_type: model.payment_type,
        }
    }
}

/// Count and total of one kind of payment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeTotal {
    /// Number of payments
    pub count: u64,
    /// Sum of their amounts
    pub total: Decimal,
}

/// Revenue overview for administrators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RevenueSummary {
    /// Feature fees collected
    pub featured: TypeTotal,
    /// Vehicle sales settled between users
    pub purchases: TypeTotal,
}

/// One row of [`report_by_type`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeReportRow {
    /// Stored payment type
    pub payment_type: String,
    /// Number of payments
    pub count: u64,
    /// Sum of their amounts
    pub total: Decimal,
}

async fn fetch(
    db: &DatabaseConnection,
    condition: Condition,
) -> Result<Vec<payment::Model>> {
    let rows = Payment::find()
        .filter(condition)
        .order_by_desc(payment::Column::PaidAt)
        .order_by_desc(payment::Column::Id)
        .all(db)
        .await?;
    debug!("Loaded {} payments", rows.len());
    Ok(rows)
}

/// Sums payments per stored type, in cents.
fn totals_by_type(payments: &[payment::Model]) -> BTreeMap<&str, (u64, i64)> {
    let mut totals: BTreeMap<&str, (u64, i64)> = BTreeMap::new();
    for p in payments {
        let entry = totals.entry(p.payment_type.as_str()).or_default();
        entry.0 += 1;
        entry.1 += p.amount_cents;
    }
    totals
}

fn type_total(totals: &BTreeMap<&str, (u64, i64)>, payment_type: PaymentType) -> TypeTotal {
    totals
        .get(payment_type.as_str())
        .map_or_else(TypeTotal::default, |&(count, cents)| TypeTotal {
            count,
            total: money::from_cents(cents),
        })
}

/// Every payment matching `filter`, newest first. Administrators only.
#[instrument(skip(db), fields(actor_id = actor.id))]
pub async fn list_payments(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: PaymentFilter,
) -> Result<Vec<PaymentView>> {
    rules::ensure_admin(actor)?;
    let rows = fetch(db, filter.to_condition()?).await?;
    Ok(rows.into_iter().map(PaymentView::from).collect())
}

/// Payments the actor made, newest first.
pub async fn my_payments(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: PaymentFilter,
) -> Result<Vec<PaymentView>> {
    let condition = filter
        .to_condition()?
        .add(payment::Column::PayerId.eq(actor.id));
    let rows = fetch(db, condition).await?;
    Ok(rows.into_iter().map(PaymentView::from).collect())
}

/// Feature revenue and purchase volume within the range. Administrators only.
///
/// The type in `filter` is ignored; both kinds are always reported.
#[instrument(skip(db), fields(actor_id = actor.id))]
pub async fn revenue_summary(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: PaymentFilter,
) -> Result<RevenueSummary> {
    rules::ensure_admin(actor)?;
    let range = PaymentFilter {
        payment_type: None,
        ..filter
    };
    let rows = fetch(db, range.to_condition()?).await?;
    let totals = totals_by_type(&rows);

    Ok(RevenueSummary {
        featured: type_total(&totals, PaymentType::FeaturedAd),
        purchases: type_total(&totals, PaymentType::Purchase),
    })
}

/// Count and total per payment type within the range, ordered by type. Administrators only.
///
/// Types with no payments are left out.
#[instrument(skip(db), fields(actor_id = actor.id))]
pub async fn report_by_type(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: PaymentFilter,
) -> Result<Vec<TypeReportRow>> {
    rules::ensure_admin(actor)?;
    let rows = fetch(db, filter.to_condition()?).await?;

    Ok(totals_by_type(&rows)
        .into_iter()
        .map(|(payment_type, (count, cents))| TypeReportRow {
            payment_type: payment_type.to_string(),
            count,
            total: money::from_cents(cents),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{listing, status::Role};
    use crate::test_utils::*;
    use rust_decimal_macros::dec;

    async fn market_with_sales() -> Result<(TestMarket, Actor)> {
        let market = setup_marketplace().await?;
        let admin = create_test_actor(&market.db, "moderator", Role::Admin).await?;

        let first = create_test_listing(&market, dec!(25000)).await?;
        let second = create_test_listing(&market, dec!(8000.50)).await?;
        listing::feature_listing(
            &market.db,
            &market.settings,
            first.advertisement.id,
            &market.seller,
            None,
        )
        .await?;
        listing::purchase_listing(
            &market.db,
            &market.settings,
            first.advertisement.id,
            &market.buyer,
            None,
        )
        .await?;
        listing::purchase_listing(
            &market.db,
            &market.settings,
            second.advertisement.id,
            &market.buyer,
            None,
        )
        .await?;

        Ok((market, admin))
    }

    #[tokio::test]
    async fn test_reports_require_admin() -> Result<()> {
        let (market, _) = market_with_sales().await?;
        let filter = PaymentFilter::default();

        assert!(matches!(
            list_payments(&market.db, &market.seller, filter).await,
            Err(Error::Authorization { .. })
        ));
        assert!(matches!(
            revenue_summary(&market.db, &market.buyer, filter).await,
            Err(Error::Authorization { .. })
        ));
        assert!(matches!(
            report_by_type(&market.db, &market.buyer, filter).await,
            Err(Error::Authorization { .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_list_payments_filters() -> Result<()> {
        let (market, admin) = market_with_sales().await?;
        let today = Utc::now().date_naive();

        let all = list_payments(&market.db, &admin, PaymentFilter::default()).await?;
        assert_eq!(all.len(), 3);
        // Newest first
        assert!(all.windows(2).all(|w| w[0].paid_at >= w[1].paid_at));

        let purchases = list_payments(
            &market.db,
            &admin,
            PaymentFilter {
                payment_type: Some(PaymentType::Purchase),
                ..PaymentFilter::default()
            },
        )
        .await?;
        assert_eq!(purchases.len(), 2);
        assert!(purchases.iter().all(|p| p.payment_type == "purchase"));

        // Inclusive single-day range
        let today_only = PaymentFilter {
            start: Some(today),
            end: Some(today),
            payment_type: None,
        };
        assert_eq!(list_payments(&market.db, &admin, today_only).await?.len(), 3);

        let last_year = PaymentFilter {
            start: Some(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
            end: Some(NaiveDate::from_ymd_opt(2020, 12, 31).unwrap()),
            payment_type: None,
        };
        assert!(list_payments(&market.db, &admin, last_year).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected() -> Result<()> {
        let (market, admin) = market_with_sales().await?;
        let filter = PaymentFilter {
            start: Some(NaiveDate::from_ymd_opt(2026, 5, 2).unwrap()),
            end: Some(NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()),
            payment_type: None,
        };

        assert!(matches!(
            list_payments(&market.db, &admin, filter).await,
            Err(Error::Validation { .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_revenue_summary() -> Result<()> {
        let (market, admin) = market_with_sales().await?;

        let summary = revenue_summary(&market.db, &admin, PaymentFilter::default()).await?;
        assert_eq!(summary.featured.count, 1);
        assert_eq!(summary.featured.total, dec!(30.00));
        assert_eq!(summary.purchases.count, 2);
        assert_eq!(summary.purchases.total, dec!(33000.50));

        Ok(())
    }

    #[tokio::test]
    async fn test_report_by_type() -> Result<()> {
        let (market, admin) = market_with_sales().await?;

        let rows = report_by_type(&market.db, &admin, PaymentFilter::default()).await?;
        assert_eq!(
            rows,
            vec![
                TypeReportRow {
                    payment_type: "featured_ad".to_string(),
                    count: 1,
                    total: dec!(30.00),
                },
                TypeReportRow {
                    payment_type: "purchase".to_string(),
                    count: 2,
                    total: dec!(33000.50),
                },
            ]
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_my_payments() -> Result<()> {
        let (market, _) = market_with_sales().await?;

        let buyer_paid = my_payments(&market.db, &market.buyer, PaymentFilter::default()).await?;
        assert_eq!(buyer_paid.len(), 2);
        assert!(buyer_paid.iter().all(|p| p.payer_id == market.buyer.id));

        let seller_paid =
            my_payments(&market.db, &market.seller, PaymentFilter::default()).await?;
        assert_eq!(seller_paid.len(), 1);
        assert_eq!(seller_paid[0].payment_type, "featured_ad");
        assert_eq!(seller_paid[0].amount, dec!(30.00));

        Ok(())
    }
}
