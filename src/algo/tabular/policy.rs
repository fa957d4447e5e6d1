/// Greedy action per state index, `None` where no action is legal
///
/// Derived from a value table on demand; see [`QTableAgent::policy`](super::QTableAgent::policy).
#[derive(Clone, Debug, PartialEq)]
pub struct Policy<A> {
    actions: Vec<Option<A>>,
}

impl<A: Copy> Policy<A> {
    /// The action for state `index`, `None` if there is none or `index` is out of range
    pub fn get(&self, index: usize) -> Option<A> {
        self.actions.get(index).copied().flatten()
    }

    /// Number of states covered
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// `(state index, action)` pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<A>)> + '_ {
        self.actions.iter().copied().enumerate()
    }
}

impl<A> From<Vec<Option<A>>> for Policy<A> {
    fn from(actions: Vec<Option<A>>) -> Self {
        Self { actions }
    }
}

impl<A> FromIterator<Option<A>> for Policy<A> {
    fn from_iter<I: IntoIterator<Item = Option<A>>>(iter: I) -> Self {
        Self {
            actions: iter.into_iter().collect(),
        }
    }
}
