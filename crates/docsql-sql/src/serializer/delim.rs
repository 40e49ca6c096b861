use std::fmt;

/// Comma delimited
#[derive(Debug, Clone, Copy)]
pub struct Comma<L>(pub L);

impl<L, I> fmt::Display for Comma<L>
where
    L: IntoIterator<Item = I> + Clone,
    I: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = "";
        for item in self.0.clone() {
            write!(f, "{s}{item}")?;
            s = ", ";
        }
        Ok(())
    }
}
