/// A derived value that is either up to date or needs recomputation.
#[derive(Debug, Clone, Default)]
pub(crate) enum Cached<T> {
    #[default]
    Dirty,
    Valid(T),
}

impl<T> Cached<T> {
    pub fn invalidate(&mut self) {
        *self = Cached::Dirty;
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Cached::Valid(_))
    }

    pub fn get_or_insert_with<F>(&mut self, f: F) -> &T
    where
        F: FnOnce() -> T,
    {
        if let Cached::Dirty = self {
            *self = Cached::Valid(f());
        }
        match self {
            Cached::Valid(value) => value,
            Cached::Dirty => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recompute_after_invalidate() {
        let mut calls = 0;
        let mut cached = Cached::default();
        assert!(!cached.is_valid());
        assert_eq!(*cached.get_or_insert_with(|| { calls += 1; 1 }), 1);
        assert_eq!(*cached.get_or_insert_with(|| { calls += 1; 2 }), 1);
        assert!(cached.is_valid());
        cached.invalidate();
        assert_eq!(*cached.get_or_insert_with(|| { calls += 1; 3 }), 3);
        assert_eq!(calls, 2);
    }
}
