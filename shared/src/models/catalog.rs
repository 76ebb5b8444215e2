//! Catalog models: warehouses, product categories, products, suppliers,
//! clients and expense categories

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A physical location holding stock
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Warehouse {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Grouping for products
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductCategory {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A category together with the products filed under it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCategoryDetail {
    #[serde(flatten)]
    pub category: ProductCategory,
    pub products: Vec<Product>,
}

/// A sellable product
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: Uuid,
    pub seq: i64,
    pub code: String,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub brand: Option<String>,
    pub unit_of_measure: String,
    pub sale_price: Decimal,
    pub min_sale_price: Option<Decimal>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A vendor the business buys stock from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    pub id: Uuid,
    pub seq: i64,
    pub code: String,
    pub name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: String,
    pub created_at: DateTime<Utc>,
}

/// A buyer known to the business
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Client {
    pub id: Uuid,
    pub seq: i64,
    pub code: String,
    pub name: String,
    pub phone: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ExpenseCategory {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A client with the number of days left until their next birthday
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingBirthday {
    pub client_id: Uuid,
    pub code: String,
    pub name: String,
    pub phone: Option<String>,
    pub birthday: NaiveDate,
    pub days_until: i64,
}

/// Days from `today` until the next anniversary of `birthday`.
///
/// A February 29 birthday falls on March 1 in non-leap years.
/// Returns 0 when the birthday is today.
pub fn days_until_birthday(birthday: NaiveDate, today: NaiveDate) -> i64 {
    let this_year = anniversary_in(birthday, today.year());
    let next = if this_year >= today {
        this_year
    } else {
        anniversary_in(birthday, today.year() + 1)
    };
    (next - today).num_days()
}

fn anniversary_in(birthday: NaiveDate, year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, birthday.month(), birthday.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
        .unwrap_or(birthday)
}

/// Pick the `limit` clients with the nearest upcoming birthdays
pub fn upcoming_birthdays(clients: &[Client], today: NaiveDate, limit: usize) -> Vec<UpcomingBirthday> {
    let mut upcoming: Vec<UpcomingBirthday> = clients
        .iter()
        .filter_map(|c| {
            c.birthday.map(|birthday| UpcomingBirthday {
                client_id: c.id,
                code: c.code.clone(),
                name: c.name.clone(),
                phone: c.phone.clone(),
                birthday,
                days_until: days_until_birthday(birthday, today),
            })
        })
        .collect();

    upcoming.sort_by(|a, b| a.days_until.cmp(&b.days_until).then_with(|| a.name.cmp(&b.name)));
    upcoming.truncate(limit);
    upcoming
}
