//! Route admission.
//!
//! One pure predicate decides admission; the synchronous render path and the
//! navigation path both consume its result, so they cannot drift apart.

use makkah_api_models::Role;

use crate::holder::Session;
use crate::routes::{Requirement, Route};

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Session not settled yet; show a neutral placeholder.
    Loading,
    /// Navigate away to the contained view.
    Redirect(Route),
    /// Show the protected content.
    Allow,
}

/// What a guarded view renders in the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Neutral loading placeholder.
    Placeholder,
    /// The protected content.
    Content,
}

impl Admission {
    /// Render decision. A pending redirect never shows the protected content.
    #[must_use]
    pub const fn render(&self) -> View {
        match self {
            Self::Allow => View::Content,
            Self::Loading | Self::Redirect(_) => View::Placeholder,
        }
    }

    /// Navigation decision.
    #[must_use]
    pub const fn redirect_target(&self) -> Option<&Route> {
        match self {
            Self::Redirect(target) => Some(target),
            Self::Loading | Self::Allow => None,
        }
    }
}

/// Decide whether `session` may view `requested` under `requirement`.
#[must_use]
pub fn admission(session: &Session, requirement: Requirement, requested: &Route) -> Admission {
    if requirement == Requirement::Public {
        return Admission::Allow;
    }
    if session.resolving {
        return Admission::Loading;
    }
    if session.identity.is_none() {
        return Admission::Redirect(Route::SignIn {
            redirect: Some(requested.path()),
        });
    }
    if requirement == Requirement::Admin && session.role != Some(Role::Admin) {
        return Admission::Redirect(Route::Home);
    }
    Admission::Allow
}

/// A requirement bound to a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guard {
    requirement: Requirement,
}

impl Guard {
    /// Guard admitting any signed-in identity.
    #[must_use]
    pub const fn signed_in() -> Self {
        Self {
            requirement: Requirement::SignedIn,
        }
    }

    /// Guard admitting only admins.
    #[must_use]
    pub const fn admin() -> Self {
        Self {
            requirement: Requirement::Admin,
        }
    }

    /// Guard matching the route's own requirement.
    #[must_use]
    pub const fn for_route(route: &Route) -> Self {
        Self {
            requirement: route.requirement(),
        }
    }

    /// Requirement enforced by this guard.
    #[must_use]
    pub const fn requirement(&self) -> Requirement {
        self.requirement
    }

    /// Admission for `requested` under this guard.
    #[must_use]
    pub fn admit(&self, session: &Session, requested: &Route) -> Admission {
        admission(session, self.requirement, requested)
    }
}

/// What the sign-in view shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInView {
    /// Session not settled yet.
    Loading,
    /// Nobody is signed in; show the form.
    Form,
    /// Already signed in; move on.
    Redirect(Route),
}

/// Decide the sign-in view. A signed-in identity returns to `redirect` when
/// it is a site-local path, otherwise admins land on the dashboard and everyone
/// else on home.
#[must_use]
pub fn sign_in_view(session: &Session, redirect: Option<&str>) -> SignInView {
    if session.resolving {
        return SignInView::Loading;
    }
    if session.identity.is_none() {
        return SignInView::Form;
    }
    let local = redirect.filter(|path| path.starts_with('/') && !path.starts_with("//"));
    let target = match local {
        Some(path) => Route::parse(path),
        None if session.is_admin() => Route::Admin,
        None => Route::Home,
    };
    SignInView::Redirect(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;

    fn identity() -> Identity {
        Identity {
            uid: "u1".into(),
            email: Some("musa@example.com".into()),
            display_name: None,
            photo_url: None,
            email_verified: true,
        }
    }

    fn session(identity: Option<Identity>, role: Option<Role>, resolving: bool) -> Session {
        Session {
            identity,
            role,
            resolving,
        }
    }

    #[test]
    fn resolving_session_is_loading_regardless_of_fields() {
        let cases = [
            session(None, None, true),
            session(Some(identity()), None, true),
            session(Some(identity()), Some(Role::Admin), true),
            session(Some(identity()), Some(Role::User), true),
        ];
        for case in &cases {
            for guard in [Guard::signed_in(), Guard::admin()] {
                let admission = guard.admit(case, &Route::AdminBlogs);
                assert_eq!(admission, Admission::Loading);
                assert_eq!(admission.render(), View::Placeholder);
                assert!(admission.redirect_target().is_none());
            }
        }
    }

    #[test]
    fn signed_out_redirects_to_sign_in_with_requested_path() {
        let admission = Guard::signed_in().admit(&session(None, None, false), &Route::AdminUsers);
        assert_eq!(
            admission.redirect_target(),
            Some(&Route::SignIn {
                redirect: Some("/admin/adminUser".into())
            })
        );
        assert_eq!(admission.render(), View::Placeholder);
    }

    #[test]
    fn signed_in_guard_allows_any_identity() {
        let admission =
            Guard::signed_in().admit(&session(Some(identity()), Some(Role::User), false), &Route::Home);
        assert_eq!(admission, Admission::Allow);
        assert_eq!(admission.render(), View::Content);
    }

    #[test]
    fn admin_guard_sends_users_home() {
        let admission =
            Guard::admin().admit(&session(Some(identity()), Some(Role::User), false), &Route::Admin);
        assert_eq!(admission.redirect_target(), Some(&Route::Home));

        let unresolved =
            Guard::admin().admit(&session(Some(identity()), None, false), &Route::Admin);
        assert_eq!(unresolved.redirect_target(), Some(&Route::Home));
    }

    #[test]
    fn admin_guard_allows_admins() {
        let admission = Guard::admin().admit(
            &session(Some(identity()), Some(Role::Admin), false),
            &Route::AdminProducts,
        );
        assert_eq!(admission.render(), View::Content);
    }

    #[test]
    fn public_routes_never_wait() {
        let guard = Guard::for_route(&Route::Shop);
        assert_eq!(guard.requirement(), Requirement::Public);
        assert_eq!(
            guard.admit(&Session::initial(), &Route::Shop),
            Admission::Allow
        );
    }

    #[test]
    fn sign_in_view_routes_by_role_or_redirect() {
        assert_eq!(sign_in_view(&Session::initial(), None), SignInView::Loading);
        assert_eq!(
            sign_in_view(&session(None, None, false), Some("/admin")),
            SignInView::Form
        );
        let admin = session(Some(identity()), Some(Role::Admin), false);
        assert_eq!(
            sign_in_view(&admin, None),
            SignInView::Redirect(Route::Admin)
        );
        assert_eq!(
            sign_in_view(&admin, Some("/admin/adminBlog")),
            SignInView::Redirect(Route::AdminBlogs)
        );
        let user = session(Some(identity()), Some(Role::User), false);
        assert_eq!(sign_in_view(&user, None), SignInView::Redirect(Route::Home));
        assert_eq!(
            sign_in_view(&user, Some("https://evil.example")),
            SignInView::Redirect(Route::Home)
        );
    }

    #[test]
    fn protocol_relative_redirects_fall_back_to_the_default() {
        let user = session(Some(identity()), Some(Role::User), false);
        assert_eq!(
            sign_in_view(&user, Some("//evil.example")),
            SignInView::Redirect(Route::Home)
        );
        let admin = session(Some(identity()), Some(Role::Admin), false);
        assert_eq!(
            sign_in_view(&admin, Some("//evil.example/admin")),
            SignInView::Redirect(Route::Admin)
        );
    }
}
