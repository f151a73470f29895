/// Catalog entity kinds that carry remote UMA2 resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    Portfolio,
    PortfolioItem,
    Order,
}

impl CatalogKind {
    pub const ALL: [Self; 3] = [Self::Portfolio, Self::PortfolioItem, Self::Order];

    /// The short type tag used in remote resource and scope names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Portfolio => "portfolio",
            Self::PortfolioItem => "portfolio_item",
            Self::Order => "order",
        }
    }

    /// Parse the plural route segment (`portfolios`, `portfolio_items`, `orders`).
    #[must_use]
    pub fn from_route_segment(segment: &str) -> Option<Self> {
        match segment {
            "portfolios" => Some(Self::Portfolio),
            "portfolio_items" => Some(Self::PortfolioItem),
            "orders" => Some(Self::Order),
            _ => None,
        }
    }

    /// Every permission a resource of this kind can be granted.
    #[must_use]
    pub const fn permissions(self) -> &'static [&'static str] {
        match self {
            Self::Portfolio => &["read", "update", "delete", "order"],
            Self::PortfolioItem => &["read", "update", "delete"],
            Self::Order => &["read", "update", "delete", "approve"],
        }
    }

    /// Permissions that may be shared with groups.
    #[must_use]
    pub const fn shareable_permissions(self) -> &'static [&'static str] {
        match self {
            Self::Portfolio => &["read", "update", "order"],
            Self::PortfolioItem | Self::Order => &["read"],
        }
    }
}

impl std::fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CatalogKind {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| crate::error::CoreError::InvalidInput(format!("unknown kind: {s}")))
    }
}
