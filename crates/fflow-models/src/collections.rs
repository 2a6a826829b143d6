//! Remote collection and storage namespace names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Named remote document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Products,
    Users,
    Orders,
    Reviews,
    Categories,
    Settings,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Products,
        Collection::Users,
        Collection::Orders,
        Collection::Reviews,
        Collection::Categories,
        Collection::Settings,
    ];

    /// Collection id as stored remotely.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::Users => "users",
            Collection::Orders => "orders",
            Collection::Reviews => "reviews",
            Collection::Categories => "categories",
            Collection::Settings => "settings",
        }
    }

    /// Singular entity name used in not-found messages.
    pub fn entity_name(&self) -> &'static str {
        match self {
            Collection::Products => "Product",
            Collection::Users => "User",
            Collection::Orders => "Order",
            Collection::Reviews => "Review",
            Collection::Categories => "Category",
            Collection::Settings => "Setting",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Object storage namespaces (key prefixes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageNamespace {
    #[default]
    ProductImages,
    UserAvatars,
    Banners,
}

impl StorageNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageNamespace::ProductImages => "products/images",
            StorageNamespace::UserAvatars => "users/avatars",
            StorageNamespace::Banners => "banners",
        }
    }
}

impl fmt::Display for StorageNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
