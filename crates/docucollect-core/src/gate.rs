//! Session gate and page routing.
//!
//! Decides which top-level view a route renders for the current session.

use std::fmt;
use std::str::FromStr;

use crate::auth::AuthSession;
use crate::models::Account;
use crate::Error;

/// Pages of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Route {
    #[default]
    Home,
    Login,
    Profile,
    ResetPassword,
}

impl Route {
    pub const ALL: [Self; 4] = [Self::Home, Self::Login, Self::Profile, Self::ResetPassword];

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Login => "/login",
            Self::Profile => "/profile",
            Self::ResetPassword => "/reset-password",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Route {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = s.trim();
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let path = path.trim_end_matches('/');
        Self::ALL
            .into_iter()
            .find(|route| route.path().trim_end_matches('/') == path)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown route '{s}'")))
    }
}

/// What a route renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Marketing page with sign-in entry points
    Landing,
    Login,
    /// Documents and notes, tab-switched
    Workspace(Account),
    Profile(Account),
    ResetPassword(Account),
    /// Navigate elsewhere instead of rendering
    Redirect(Route),
    /// Reset page opened without the recovery session from the email link
    ResetLinkExpired,
}

pub struct SessionGate;

impl SessionGate {
    /// Resolve `route` against the current session.
    ///
    /// Only sessions with a confirmed email count as signed in, except on the
    /// reset page where the recovery link itself proves the address.
    #[must_use]
    pub fn resolve(route: Route, session: Option<&AuthSession>) -> View {
        let confirmed = session
            .filter(|session| session.user.is_email_confirmed())
            .map(|session| Account::from(&session.user));

        match (route, confirmed) {
            (Route::Home, Some(account)) => View::Workspace(account),
            (Route::Home, None) => View::Landing,
            (Route::Login, Some(_)) => View::Redirect(Route::Home),
            (Route::Login, None) => View::Login,
            (Route::Profile, Some(account)) => View::Profile(account),
            (Route::Profile, None) => View::Redirect(Route::Home),
            (Route::ResetPassword, _) => session.map_or(View::ResetLinkExpired, |session| {
                View::ResetPassword(Account::from(&session.user))
            }),
        }
    }
}

/// Tabs of the signed-in workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkspaceTab {
    #[default]
    Documents,
    Notes,
}

impl WorkspaceTab {
    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Documents => Self::Notes,
            Self::Notes => Self::Documents,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Documents => "Documents",
            Self::Notes => "Notes",
        }
    }
}
