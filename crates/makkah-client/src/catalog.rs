//! Reads behind the public pages.

use makkah_api_models::{Blog, EventListing, Package, PackageCategory, Product, Review};
use tracing::instrument;

use crate::client::ApiClient;
use crate::error::ApiResult;

/// Shop page data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShopView {
    /// All products.
    pub products: Vec<Product>,
    /// Distinct categories for the filter bar.
    pub categories: Vec<String>,
}

impl ShopView {
    /// Products in `category`; `"All"` selects everything.
    #[must_use]
    pub fn in_category(&self, category: &str) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|product| category == "All" || product.category == category)
            .collect()
    }
}

/// Public page reads over an [`ApiClient`].
#[derive(Clone)]
pub struct Catalog {
    client: ApiClient,
}

impl Catalog {
    /// Wrap a client.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Packages of one category, in backend order.
    ///
    /// # Errors
    ///
    /// Returns the client error.
    #[instrument(name = "catalog.packages", skip(self))]
    pub async fn packages(&self, category: PackageCategory) -> ApiResult<Vec<Package>> {
        let mut packages: Vec<Package> = self.client.list().await?;
        packages.retain(|package| package.category == category);
        Ok(packages)
    }

    /// One package.
    ///
    /// # Errors
    ///
    /// Returns the client error.
    pub async fn package(&self, id: &str) -> ApiResult<Package> {
        self.client.fetch(id).await
    }

    /// Blog posts.
    ///
    /// # Errors
    ///
    /// Returns the client error.
    pub async fn blogs(&self) -> ApiResult<Vec<Blog>> {
        self.client.list_blogs().await
    }

    /// One blog post.
    ///
    /// # Errors
    ///
    /// Returns the client error.
    pub async fn blog(&self, id: &str) -> ApiResult<Blog> {
        self.client.fetch(id).await
    }

    /// Customer reviews.
    ///
    /// # Errors
    ///
    /// Returns the client error.
    pub async fn reviews(&self) -> ApiResult<Vec<Review>> {
        self.client.list().await
    }

    /// Agency events.
    ///
    /// # Errors
    ///
    /// Returns the client error.
    pub async fn events(&self) -> ApiResult<Vec<EventListing>> {
        self.client.list().await
    }

    /// Products and categories, fetched concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first client error.
    #[instrument(name = "catalog.shop", skip(self))]
    pub async fn shop(&self) -> ApiResult<ShopView> {
        let (products, categories) =
            tokio::join!(self.client.list::<Product>(), self.client.product_categories());
        Ok(ShopView {
            products: products?,
            categories: categories?,
        })
    }
}
