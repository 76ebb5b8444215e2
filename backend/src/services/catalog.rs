//! Catalog service: warehouses, product categories, products, suppliers,
//! clients and expense categories

use chrono::{FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    code_prefix, Client, ExpenseCategory, Product, ProductCategory, ProductCategoryDetail, Supplier, UpcomingBirthday,
    Warehouse,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use super::next_code;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;

/// Catalog service
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
    offset: FixedOffset,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WarehouseInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(max = 250))]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub category_id: Option<Uuid>,
    #[validate(length(max = 120))]
    pub brand: Option<String>,
    #[validate(length(min = 1, max = 40))]
    pub unit_of_measure: Option<String>,
    pub sale_price: Decimal,
    pub min_sale_price: Option<Decimal>,
    #[validate(url)]
    pub image_url: Option<String>,
}

/// Product update; absent fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
    #[validate(length(max = 120))]
    pub brand: Option<String>,
    #[validate(length(min = 1, max = 40))]
    pub unit_of_measure: Option<String>,
    pub sale_price: Option<Decimal>,
    pub min_sale_price: Option<Decimal>,
    #[validate(url)]
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductCategoryInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSupplierInput {
    #[validate(length(min = 2, max = 200))]
    pub name: String,
    #[validate(length(max = 200))]
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    #[validate(length(max = 250))]
    pub address: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub city: String,
}

/// Supplier update; absent fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSupplierInput {
    #[validate(length(min = 2, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 200))]
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    #[validate(length(max = 250))]
    pub address: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub city: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub phone: Option<String>,
    pub birthday: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExpenseCategoryInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
}

const PRODUCT_COLUMNS: &str = "id, seq, code, category_id, name, brand, unit_of_measure, sale_price, min_sale_price, \
     image_url, is_active, created_at";

const CATEGORY_COLUMNS: &str = "id, name, description, created_at";

const SUPPLIER_COLUMNS: &str = "id, seq, code, name, contact_name, phone, address, city, created_at";

const CLIENT_COLUMNS: &str = "id, seq, code, name, phone, birthday, created_at";

/// Register `name` as a client unless one with that name already exists
pub async fn register_client_if_missing_tx(conn: &mut PgConnection, name: &str) -> AppResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(());
    }

    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM clients WHERE name = $1)")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    if exists {
        return Ok(());
    }

    let (seq, code) = next_code(conn, "client_seq", code_prefix::CLIENT).await?;
    sqlx::query("INSERT INTO clients (seq, code, name) VALUES ($1, $2, $3) ON CONFLICT (name) DO NOTHING")
        .bind(seq)
        .bind(&code)
        .bind(name)
        .execute(&mut *conn)
        .await?;

    tracing::debug!(code = %code, "Buyer registered as client");
    Ok(())
}

async fn ensure_category_exists(conn: &mut PgConnection, category_id: Option<Uuid>) -> AppResult<()> {
    let Some(category_id) = category_id else {
        return Ok(());
    };
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM product_categories WHERE id = $1)")
        .bind(category_id)
        .fetch_one(&mut *conn)
        .await?;
    if exists {
        Ok(())
    } else {
        Err(AppError::not_found("Product category"))
    }
}

fn validate_optional_phone(phone: Option<&str>) -> AppResult<()> {
    if let Some(phone) = phone {
        shared::validate_phone(phone).map_err(|m| AppError::validation("phone", m))?;
    }
    Ok(())
}

fn validate_prices(sale_price: Option<Decimal>, min_sale_price: Option<Decimal>) -> AppResult<()> {
    if let Some(price) = sale_price {
        shared::validate_non_negative_amount(price).map_err(|m| AppError::validation("sale_price", m))?;
    }
    if let Some(price) = min_sale_price {
        shared::validate_non_negative_amount(price).map_err(|m| AppError::validation("min_sale_price", m))?;
    }
    Ok(())
}

impl CatalogService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            offset: config.business.offset(),
        }
    }

    // ========================================================================
    // Warehouses
    // ========================================================================

    pub async fn create_warehouse(&self, actor: &AuthUser, input: WarehouseInput) -> AppResult<Warehouse> {
        actor.require_admin()?;
        input.validate()?;

        let warehouse = sqlx::query_as::<_, Warehouse>(
            "INSERT INTO warehouses (name, address) VALUES ($1, $2) RETURNING id, name, address, created_at",
        )
        .bind(input.name.trim())
        .bind(&input.address)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(warehouse_id = %warehouse.id, name = %warehouse.name, "Warehouse created");
        Ok(warehouse)
    }

    pub async fn list_warehouses(&self) -> AppResult<Vec<Warehouse>> {
        let warehouses = sqlx::query_as::<_, Warehouse>(
            "SELECT id, name, address, created_at FROM warehouses ORDER BY created_at",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(warehouses)
    }

    pub async fn get_warehouse(&self, warehouse_id: Uuid) -> AppResult<Warehouse> {
        sqlx::query_as::<_, Warehouse>("SELECT id, name, address, created_at FROM warehouses WHERE id = $1")
            .bind(warehouse_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Warehouse"))
    }

    pub async fn update_warehouse(&self, actor: &AuthUser, warehouse_id: Uuid, input: WarehouseInput) -> AppResult<Warehouse> {
        actor.require_admin()?;
        input.validate()?;

        sqlx::query_as::<_, Warehouse>(
            r#"
            UPDATE warehouses SET name = $2, address = $3
            WHERE id = $1
            RETURNING id, name, address, created_at
            "#,
        )
        .bind(warehouse_id)
        .bind(input.name.trim())
        .bind(&input.address)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Warehouse"))
    }

    // ========================================================================
    // Products
    // ========================================================================

    pub async fn create_product(&self, actor: &AuthUser, input: CreateProductInput) -> AppResult<Product> {
        actor.require_admin()?;
        input.validate()?;
        validate_prices(Some(input.sale_price), input.min_sale_price)?;

        let mut tx = self.db.begin().await?;
        ensure_category_exists(&mut tx, input.category_id).await?;
        let (seq, code) = next_code(&mut tx, "product_seq", code_prefix::PRODUCT).await?;

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products
                (seq, code, name, brand, unit_of_measure, sale_price, min_sale_price, image_url, category_id)
            VALUES ($1, $2, $3, $4, COALESCE($5, 'unidad'), $6, $7, $8, $9)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(seq)
        .bind(&code)
        .bind(input.name.trim())
        .bind(&input.brand)
        .bind(&input.unit_of_measure)
        .bind(shared::round2(input.sale_price))
        .bind(input.min_sale_price.map(shared::round2))
        .bind(&input.image_url)
        .bind(input.category_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(product_id = %product.id, code = %product.code, "Product created");
        Ok(product)
    }

    /// List products; `active_only` hides deactivated ones
    pub async fn list_products(&self, active_only: bool) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE ($1 = FALSE OR is_active) ORDER BY name",
            PRODUCT_COLUMNS
        ))
        .bind(active_only)
        .fetch_all(&self.db)
        .await?;
        Ok(products)
    }

    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, Product>(&format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS))
            .bind(product_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))
    }

    pub async fn update_product(&self, actor: &AuthUser, product_id: Uuid, input: UpdateProductInput) -> AppResult<Product> {
        actor.require_admin()?;
        input.validate()?;
        validate_prices(input.sale_price, input.min_sale_price)?;

        let mut conn = self.db.acquire().await?;
        ensure_category_exists(&mut conn, input.category_id).await?;

        sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                brand = COALESCE($3, brand),
                unit_of_measure = COALESCE($4, unit_of_measure),
                sale_price = COALESCE($5, sale_price),
                min_sale_price = COALESCE($6, min_sale_price),
                image_url = COALESCE($7, image_url),
                is_active = COALESCE($8, is_active),
                category_id = COALESCE($9, category_id)
            WHERE id = $1
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(&input.brand)
        .bind(&input.unit_of_measure)
        .bind(input.sale_price.map(shared::round2))
        .bind(input.min_sale_price.map(shared::round2))
        .bind(&input.image_url)
        .bind(input.is_active)
        .bind(input.category_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))
    }

    pub async fn count_products(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    // ========================================================================
    // Product categories
    // ========================================================================

    pub async fn create_product_category(&self, actor: &AuthUser, input: ProductCategoryInput) -> AppResult<ProductCategory> {
        actor.require_admin()?;
        input.validate()?;

        let category = sqlx::query_as::<_, ProductCategory>(&format!(
            "INSERT INTO product_categories (name, description) VALUES ($1, $2) RETURNING {}",
            CATEGORY_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(&input.description)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(category_id = %category.id, name = %category.name, "Product category created");
        Ok(category)
    }

    pub async fn list_product_categories(&self) -> AppResult<Vec<ProductCategory>> {
        let categories = sqlx::query_as::<_, ProductCategory>(&format!(
            "SELECT {} FROM product_categories ORDER BY name",
            CATEGORY_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(categories)
    }

    /// One category with its products
    pub async fn get_product_category(&self, category_id: Uuid) -> AppResult<ProductCategoryDetail> {
        let category = sqlx::query_as::<_, ProductCategory>(&format!(
            "SELECT {} FROM product_categories WHERE id = $1",
            CATEGORY_COLUMNS
        ))
        .bind(category_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Product category"))?;

        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE category_id = $1 ORDER BY name",
            PRODUCT_COLUMNS
        ))
        .bind(category_id)
        .fetch_all(&self.db)
        .await?;

        Ok(ProductCategoryDetail { category, products })
    }

    pub async fn update_product_category(
        &self,
        actor: &AuthUser,
        category_id: Uuid,
        input: ProductCategoryInput,
    ) -> AppResult<ProductCategory> {
        actor.require_admin()?;
        input.validate()?;

        sqlx::query_as::<_, ProductCategory>(&format!(
            "UPDATE product_categories SET name = $2, description = $3 WHERE id = $1 RETURNING {}",
            CATEGORY_COLUMNS
        ))
        .bind(category_id)
        .bind(input.name.trim())
        .bind(&input.description)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Product category"))
    }

    /// Delete a category; its products stay, uncategorized
    pub async fn delete_product_category(&self, actor: &AuthUser, category_id: Uuid) -> AppResult<()> {
        actor.require_admin()?;

        let result = sqlx::query("DELETE FROM product_categories WHERE id = $1")
            .bind(category_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Product category"));
        }

        tracing::info!(%category_id, "Product category deleted");
        Ok(())
    }

    // ========================================================================
    // Suppliers
    // ========================================================================

    pub async fn create_supplier(&self, actor: &AuthUser, input: CreateSupplierInput) -> AppResult<Supplier> {
        actor.require_admin()?;
        input.validate()?;
        validate_optional_phone(input.phone.as_deref())?;

        let mut tx = self.db.begin().await?;
        let (seq, code) = next_code(&mut tx, "supplier_seq", code_prefix::SUPPLIER).await?;

        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            INSERT INTO suppliers (seq, code, name, contact_name, phone, address, city)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            SUPPLIER_COLUMNS
        ))
        .bind(seq)
        .bind(&code)
        .bind(input.name.trim())
        .bind(&input.contact_name)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(input.city.trim())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(supplier_id = %supplier.id, code = %supplier.code, "Supplier created");
        Ok(supplier)
    }

    pub async fn list_suppliers(&self) -> AppResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(&format!("SELECT {} FROM suppliers ORDER BY seq", SUPPLIER_COLUMNS))
            .fetch_all(&self.db)
            .await?;
        Ok(suppliers)
    }

    pub async fn get_supplier(&self, supplier_id: Uuid) -> AppResult<Supplier> {
        sqlx::query_as::<_, Supplier>(&format!("SELECT {} FROM suppliers WHERE id = $1", SUPPLIER_COLUMNS))
            .bind(supplier_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Supplier"))
    }

    pub async fn update_supplier(&self, actor: &AuthUser, supplier_id: Uuid, input: UpdateSupplierInput) -> AppResult<Supplier> {
        actor.require_admin()?;
        input.validate()?;
        validate_optional_phone(input.phone.as_deref())?;

        sqlx::query_as::<_, Supplier>(&format!(
            r#"
            UPDATE suppliers SET
                name = COALESCE($2, name),
                contact_name = COALESCE($3, contact_name),
                phone = COALESCE($4, phone),
                address = COALESCE($5, address),
                city = COALESCE($6, city)
            WHERE id = $1
            RETURNING {}
            "#,
            SUPPLIER_COLUMNS
        ))
        .bind(supplier_id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(&input.contact_name)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(input.city.as_deref().map(str::trim))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Supplier"))
    }

    pub async fn delete_supplier(&self, actor: &AuthUser, supplier_id: Uuid) -> AppResult<()> {
        actor.require_admin()?;

        let result = sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(supplier_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Supplier"));
        }

        tracing::info!(%supplier_id, "Supplier deleted");
        Ok(())
    }

    // ========================================================================
    // Clients
    // ========================================================================

    pub async fn create_client(&self, input: CreateClientInput) -> AppResult<Client> {
        input.validate()?;
        validate_optional_phone(input.phone.as_deref())?;

        let mut tx = self.db.begin().await?;
        let (seq, code) = next_code(&mut tx, "client_seq", code_prefix::CLIENT).await?;

        let client = sqlx::query_as::<_, Client>(&format!(
            "INSERT INTO clients (seq, code, name, phone, birthday) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            CLIENT_COLUMNS
        ))
        .bind(seq)
        .bind(&code)
        .bind(input.name.trim())
        .bind(&input.phone)
        .bind(input.birthday)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(client_id = %client.id, code = %client.code, "Client created");
        Ok(client)
    }

    pub async fn list_clients(&self) -> AppResult<Vec<Client>> {
        let clients = sqlx::query_as::<_, Client>(&format!("SELECT {} FROM clients ORDER BY name", CLIENT_COLUMNS))
            .fetch_all(&self.db)
            .await?;
        Ok(clients)
    }

    pub async fn get_client(&self, client_id: Uuid) -> AppResult<Client> {
        sqlx::query_as::<_, Client>(&format!("SELECT {} FROM clients WHERE id = $1", CLIENT_COLUMNS))
            .bind(client_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Client"))
    }

    pub async fn count_clients(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    /// Clients with a birthday, soonest first
    pub async fn upcoming_birthdays(&self, limit: usize) -> AppResult<Vec<UpcomingBirthday>> {
        let clients = sqlx::query_as::<_, Client>(&format!(
            "SELECT {} FROM clients WHERE birthday IS NOT NULL",
            CLIENT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        let today = shared::business_today(self.offset);
        Ok(shared::upcoming_birthdays(&clients, today, limit))
    }

    // ========================================================================
    // Expense categories
    // ========================================================================

    pub async fn create_expense_category(&self, input: ExpenseCategoryInput) -> AppResult<ExpenseCategory> {
        input.validate()?;
        let category = sqlx::query_as::<_, ExpenseCategory>(
            "INSERT INTO expense_categories (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(input.name.trim())
        .fetch_one(&self.db)
        .await?;
        Ok(category)
    }

    pub async fn list_expense_categories(&self) -> AppResult<Vec<ExpenseCategory>> {
        let categories = sqlx::query_as::<_, ExpenseCategory>(
            "SELECT id, name, created_at FROM expense_categories ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(categories)
    }
}
