//! Site views and their paths.

use std::fmt::{self, Display, Formatter};

/// Admission requirement attached to a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Anyone may view.
    Public,
    /// A signed-in identity is required.
    SignedIn,
    /// A signed-in identity holding the admin role is required.
    Admin,
}

/// Every view the site serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/`
    Home,
    /// `/About`
    About,
    /// `/Contact`
    Contact,
    /// `/Hajj`
    Hajj,
    /// `/Hajj/:id`
    HajjPackage {
        /// Package identifier.
        id: String,
    },
    /// `/Hajj-Guide`
    HajjGuide,
    /// `/Umrah-Guide`
    UmrahGuide,
    /// `/Blog`
    Blog,
    /// `/Blog/:id`
    BlogPost {
        /// Post identifier.
        id: String,
    },
    /// `/Shop`
    Shop,
    /// `/login?redirect=...`
    SignIn {
        /// Path to return to after signing in.
        redirect: Option<String>,
    },
    /// `/admin`
    Admin,
    /// `/admin/adminPackage`
    AdminPackages,
    /// `/admin/adminBlog`
    AdminBlogs,
    /// `/admin/adminReview`
    AdminReviews,
    /// `/admin/adminEvent`
    AdminEvents,
    /// `/admin/adminProduct`
    AdminProducts,
    /// `/admin/adminUser`
    AdminUsers,
    /// Anything else.
    NotFound {
        /// Path as requested.
        path: String,
    },
}

impl Route {
    /// Parse a site path, including an optional query string. Relative paths
    /// name no view and parse as [`Route::NotFound`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let (path, query) = raw.split_once('?').unwrap_or((raw, ""));
        if !path.starts_with('/') {
            return Self::NotFound {
                path: raw.to_string(),
            };
        }
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').skip(1).collect();
        match segments.as_slice() {
            [] | [""] => Self::Home,
            ["About"] => Self::About,
            ["Contact"] => Self::Contact,
            ["Hajj"] => Self::Hajj,
            ["Hajj", id] if !id.is_empty() => Self::HajjPackage {
                id: (*id).to_string(),
            },
            ["Hajj-Guide"] => Self::HajjGuide,
            ["Umrah-Guide"] => Self::UmrahGuide,
            ["Blog"] => Self::Blog,
            ["Blog", id] if !id.is_empty() => Self::BlogPost {
                id: (*id).to_string(),
            },
            ["Shop"] => Self::Shop,
            ["login"] => Self::SignIn {
                redirect: redirect_param(query),
            },
            ["admin"] => Self::Admin,
            ["admin", "adminPackage"] => Self::AdminPackages,
            ["admin", "adminBlog"] => Self::AdminBlogs,
            ["admin", "adminReview"] => Self::AdminReviews,
            ["admin", "adminEvent"] => Self::AdminEvents,
            ["admin", "adminProduct"] => Self::AdminProducts,
            ["admin", "adminUser"] => Self::AdminUsers,
            _ => Self::NotFound {
                path: raw.to_string(),
            },
        }
    }

    /// Path (and query) that navigates to this view.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".into(),
            Self::About => "/About".into(),
            Self::Contact => "/Contact".into(),
            Self::Hajj => "/Hajj".into(),
            Self::HajjPackage { id } => format!("/Hajj/{id}"),
            Self::HajjGuide => "/Hajj-Guide".into(),
            Self::UmrahGuide => "/Umrah-Guide".into(),
            Self::Blog => "/Blog".into(),
            Self::BlogPost { id } => format!("/Blog/{id}"),
            Self::Shop => "/Shop".into(),
            Self::SignIn { redirect: None } => "/login".into(),
            Self::SignIn {
                redirect: Some(redirect),
            } => format!("/login?redirect={}", urlencoding::encode(redirect)),
            Self::Admin => "/admin".into(),
            Self::AdminPackages => "/admin/adminPackage".into(),
            Self::AdminBlogs => "/admin/adminBlog".into(),
            Self::AdminReviews => "/admin/adminReview".into(),
            Self::AdminEvents => "/admin/adminEvent".into(),
            Self::AdminProducts => "/admin/adminProduct".into(),
            Self::AdminUsers => "/admin/adminUser".into(),
            Self::NotFound { path } => path.clone(),
        }
    }

    /// Guard the view needs.
    #[must_use]
    pub const fn requirement(&self) -> Requirement {
        match self {
            Self::Admin
            | Self::AdminPackages
            | Self::AdminBlogs
            | Self::AdminReviews
            | Self::AdminEvents
            | Self::AdminProducts
            | Self::AdminUsers => Requirement::Admin,
            _ => Requirement::Public,
        }
    }
}

impl Display for Route {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.path())
    }
}

fn redirect_param(query: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "redirect")
        .and_then(|(_, value)| urlencoding::decode(value).ok())
        .map(std::borrow::Cow::into_owned)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_paths_round_trip() {
        let routes = [
            Route::Home,
            Route::About,
            Route::Contact,
            Route::Hajj,
            Route::HajjPackage { id: "p1".into() },
            Route::HajjGuide,
            Route::UmrahGuide,
            Route::Blog,
            Route::BlogPost { id: "b9".into() },
            Route::Shop,
            Route::SignIn { redirect: None },
            Route::SignIn {
                redirect: Some("/admin/adminBlog".into()),
            },
            Route::Admin,
            Route::AdminPackages,
            Route::AdminBlogs,
            Route::AdminReviews,
            Route::AdminEvents,
            Route::AdminProducts,
            Route::AdminUsers,
        ];
        for route in routes {
            assert_eq!(Route::parse(&route.path()), route, "{route}");
        }
    }

    #[test]
    fn sign_in_redirect_is_percent_encoded() {
        let route = Route::SignIn {
            redirect: Some("/admin/adminUser".into()),
        };
        assert_eq!(route.path(), "/login?redirect=%2Fadmin%2FadminUser");
    }

    #[test]
    fn unknown_paths_are_not_found() {
        assert_eq!(
            Route::parse("/hajj"),
            Route::NotFound {
                path: "/hajj".into()
            }
        );
        assert_eq!(Route::parse("/admin/"), Route::Admin);
    }

    #[test]
    fn paths_without_leading_slash_are_not_found() {
        assert_eq!(
            Route::parse("Shop"),
            Route::NotFound {
                path: "Shop".into()
            }
        );
        assert_eq!(
            Route::parse("admin/adminUser"),
            Route::NotFound {
                path: "admin/adminUser".into()
            }
        );
        assert_eq!(
            Route::parse(""),
            Route::NotFound { path: String::new() }
        );
        assert_eq!(Route::parse("/"), Route::Home);
    }

    #[test]
    fn admin_screens_require_admin() {
        assert_eq!(Route::AdminEvents.requirement(), Requirement::Admin);
        assert_eq!(Route::Admin.requirement(), Requirement::Admin);
        assert_eq!(Route::Shop.requirement(), Requirement::Public);
        assert_eq!(
            Route::SignIn { redirect: None }.requirement(),
            Requirement::Public
        );
    }
}
