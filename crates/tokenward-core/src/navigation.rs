//! Routing hook for the hosting application.

/// Route shown when the session ends.
pub const LOGIN_ROUTE: &str = "/login";

/// Moves the hosting application to another screen.
pub trait Navigator: Send + Sync {
    fn navigate_to(&self, route: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn navigate_to(&self, route: &str) {
        self(route)
    }
}
