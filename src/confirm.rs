//! Interactive confirmation for destructive actions

/// Asks the user before a destructive request is issued.
///
/// Closures work directly, which keeps tests free of any terminal:
///
/// ```
/// use table_admin::confirm::Confirm;
///
/// let mut always = |_: &str| true;
/// assert!(always.confirm("Delete table \"users\"?"));
/// ```
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}
