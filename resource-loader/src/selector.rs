//! Memoized derived values.
//!
//! A [`Selector`] recomputes its output only when its input changes (by `PartialEq`).
//! Typical use: remap raw loaded values to display values without redoing the work on
//! every transition that leaves the payload unchanged.

use crate::state::LoadView;

pub struct Selector<I, O, F> {
    compute: F,
    last: Option<(I, O)>,
    recomputations: usize,
}

impl<I, O, F> Selector<I, O, F>
where
    I: PartialEq + Clone,
    O: Clone,
    F: FnMut(&I) -> O,
{
    pub fn new(compute: F) -> Self {
        Self {
            compute,
            last: None,
            recomputations: 0,
        }
    }

    pub fn select(&mut self, input: &I) -> O {
        if let Some((last_input, output)) = &self.last {
            if last_input == input {
                return output.clone();
            }
        }
        let output = (self.compute)(input);
        self.recomputations += 1;
        self.last = Some((input.clone(), output.clone()));
        output
    }

    /// Derives a view: `data` goes through [`Selector::select`], flags pass through.
    pub fn select_view(&mut self, view: &LoadView<I>) -> LoadView<O> {
        LoadView {
            data: view.data.as_ref().map(|data| self.select(data)),
            loading: view.loading,
            error: view.error.clone(),
        }
    }

    /// How many times the compute function has run.
    pub fn recomputations(&self) -> usize {
        self.recomputations
    }

    /// Forgets the memoized value.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
