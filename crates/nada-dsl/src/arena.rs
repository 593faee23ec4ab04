use std::{
    fmt,
    hash::Hash,
    iter::{Enumerate, ExactSizeIterator, FusedIterator},
    marker::PhantomData,
    slice,
};

pub(crate) trait Key:
    Copy + Clone + fmt::Debug + Eq + PartialEq + Hash + Ord + Sized + 'static
{
    fn to_usize(self) -> usize;
    fn from_usize(id: usize) -> Self;
}

/// Append-only storage addressed by dense keys.
///
/// A key is the position its value was inserted at, so keys are handed out
/// in increasing order and never reused until the arena is truncated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Arena<K, V> {
    items: Vec<V>,
    _marker: PhantomData<fn() -> K>,
}

impl<K, V> Arena<K, V> {
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops every item inserted at or after position `len`.
    pub fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<K, V> Arena<K, V>
where
    K: Key,
{
    /// The key the next inserted item will receive.
    pub fn next_key(&self) -> K {
        K::from_usize(self.items.len())
    }

    pub fn insert_with_key<F>(&mut self, f: F) -> K
    where
        F: FnOnce(K) -> V,
    {
        let id = self.next_key();
        let item = f(id);
        self.items.push(item);
        id
    }

    pub fn get(&self, id: K) -> Option<&V> {
        self.items.get(id.to_usize())
    }

    pub fn get_mut(&mut self, id: K) -> Option<&mut V> {
        self.items.get_mut(id.to_usize())
    }

    pub fn iter(&self) -> ArenaIter<'_, K, V> {
        ArenaIter {
            iter: self.items.iter().enumerate(),
            _marker: PhantomData,
        }
    }
}

impl<K, V> Default for Arena<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, K, V> IntoIterator for &'a Arena<K, V>
where
    K: Key,
{
    type Item = (K, &'a V);
    type IntoIter = ArenaIter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub(crate) struct ArenaIter<'a, K, V> {
    iter: Enumerate<slice::Iter<'a, V>>,
    _marker: PhantomData<fn() -> K>,
}

impl<'a, K, V> Iterator for ArenaIter<'a, K, V>
where
    K: Key,
{
    type Item = (K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(i, v)| (K::from_usize(i), v))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ArenaIter<'_, K, V>
where
    K: Key,
{
    #[inline]
    fn len(&self) -> usize {
        self.iter.len()
    }
}

impl<K, V> FusedIterator for ArenaIter<'_, K, V> where K: Key {}

macro_rules! new_key_type {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(
            Copy,
            Clone,
            Default,
            Debug,
            Eq,
            PartialEq,
            Ord,
            PartialOrd,
            std::hash::Hash,
        )]
        $vis struct $name(u32);

        impl $crate::arena::Key for $name {
            #[inline]
            fn to_usize(self) -> usize {
                // `u32` always fits in `usize` on supported targets.
                self.0 as usize
            }

            #[inline]
            #[allow(clippy::expect_used)]
            fn from_usize(id: usize) -> Self {
                Self(u32::try_from(id).expect("arena key must fit in u32"))
            }
        }
    };
}
pub(crate) use new_key_type;
