//! Free list for objects that are expensive to allocate per frame.

/// A free list of reusable values.
///
/// Every [`Pool::create`] should be paired with a [`Pool::release`];
/// values that are never released simply stop being reused.
#[derive(Debug)]
pub struct Pool<T> {
    free: Vec<T>,
    created: usize,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> {
    pub fn new() -> Self {
        Self {
            free: Vec::new(),
            created: 0,
        }
    }

    /// Take a released value, or build a new one with `make`.
    pub fn create(&mut self, make: impl FnOnce() -> T) -> T {
        match self.free.pop() {
            Some(value) => value,
            None => {
                self.created += 1;
                make()
            }
        }
    }

    /// Like [`Pool::create`] for constructors that can fail.
    pub fn try_create<E>(&mut self, make: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        match self.free.pop() {
            Some(value) => Ok(value),
            None => {
                let value = make()?;
                self.created += 1;
                Ok(value)
            }
        }
    }

    pub fn release(&mut self, value: T) {
        self.free.push(value);
    }

    /// Values waiting for reuse.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Values built by this pool so far.
    pub fn created(&self) -> usize {
        self.created
    }

    pub fn clear(&mut self) {
        self.free.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_released_values_are_reused() {
        let mut pool = Pool::new();
        let a = pool.create(|| vec![1u8; 4]);
        pool.release(a);
        assert_eq!(pool.available(), 1);

        let b = pool.create(Vec::new);
        assert_eq!(b, vec![1u8; 4]);
        assert_eq!(pool.created(), 1);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_failed_construction_is_not_counted() {
        let mut pool: Pool<u32> = Pool::new();
        let result: Result<u32, &str> = pool.try_create(|| Err("no memory"));
        assert!(result.is_err());
        assert_eq!(pool.created(), 0);
    }
}
