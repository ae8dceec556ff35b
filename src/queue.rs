//! Packed queues of shapes.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::gameplay::Shape;

/// The longest queue a [`Queue`] can hold.
pub const MAX_QUEUE: usize = 21;

/// A sequence of up to 21 shapes, packed three bits per shape with the
/// first shape in the low bits.
///
/// The integer inside can be used to refer to this queue by number, and
/// its derived ordering is used for deterministic set iteration. It is
/// *not* the display order; sorting for output goes through
/// [`natural_order_key`].
///
/// [`natural_order_key`]: Queue::natural_order_key
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Queue(pub u64);

impl Queue {
    /// An empty queue.
    pub fn empty() -> Queue {
        Queue(0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of shapes in this queue.
    pub fn len(self) -> usize {
        let highest_one = 64 - self.0.leading_zeros() as usize;
        (highest_one + 2) / 3
    }

    /// Push a shape onto the front of this queue. The given shape will now
    /// be first.
    #[must_use]
    pub fn push_first(self, shape: Shape) -> Queue {
        let new = (shape as u64) + 1;
        let rest = self.0 << 3;
        Queue(new | rest)
    }

    /// Push a shape onto the end of this queue. The given shape will now
    /// be last.
    #[must_use]
    pub fn push_last(self, shape: Shape) -> Queue {
        let highest_one = 64 - self.0.leading_zeros();
        let rounded_up = (highest_one + 2) / 3 * 3;
        let new = ((shape as u64) + 1) << rounded_up;

        Queue(self.0 | new)
    }

    /// Append another queue after this one.
    #[must_use]
    pub fn concat(self, rest: Queue) -> Queue {
        Queue(self.0 | rest.0 << (3 * self.len()))
    }

    /// Build a queue from a slice of shapes. Requires at most
    /// [`MAX_QUEUE`] shapes.
    pub fn from_shapes(shapes: &[Shape]) -> Queue {
        assert!(shapes.len() <= MAX_QUEUE);

        let mut queue = Queue::empty();
        for &shape in shapes {
            queue = queue.push_last(shape);
        }
        queue
    }

    /// Sort key ordering queues by length, then lexically by shape name.
    ///
    /// Within one length, packing shapes most-significant-first makes the
    /// integer comparison agree with string comparison.
    pub fn natural_order_key(self) -> (usize, u64) {
        let mut key = 0;
        for shape in self {
            key = key << 3 | (shape as u64 + 1);
        }
        (self.len(), key)
    }
}

impl Iterator for Queue {
    type Item = Shape;

    fn next(&mut self) -> Option<Shape> {
        let first = match self.0 & 0b111 {
            0 => None,
            n => Shape::try_from(n as u8 - 1),
        };

        self.0 >>= 3;

        first
    }
}

impl FromStr for Queue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Queue, Error> {
        let mut shapes = Vec::new();
        for c in s.chars() {
            shapes.push(Shape::from_char(c).ok_or(Error::UnknownShape(c))?);
        }
        if shapes.len() > MAX_QUEUE {
            return Err(Error::QueueTooLong(shapes.len()));
        }
        Ok(Queue::from_shapes(&shapes))
    }
}

impl fmt::Display for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for shape in *self {
            f.write_str(shape.name())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_iterate() {
        let queue = Queue::empty()
            .push_last(Shape::S)
            .push_last(Shape::Z)
            .push_first(Shape::I);

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.to_string(), "ISZ");
        assert_eq!(
            queue.collect::<Vec<_>>(),
            vec![Shape::I, Shape::S, Shape::Z]
        );
    }

    #[test]
    fn parse_round_trip() {
        for s in ["", "I", "OO", "IJLOSTZ", "ZZZZZZZZZZZZZZZZZZZZZ"] {
            let queue: Queue = s.parse().unwrap();
            assert_eq!(queue.to_string(), s);
            assert_eq!(queue.len(), s.len());
        }

        assert!(matches!(
            "IJX".parse::<Queue>(),
            Err(Error::UnknownShape('X'))
        ));
        assert!(matches!(
            "I".repeat(22).parse::<Queue>(),
            Err(Error::QueueTooLong(22))
        ));
    }

    #[test]
    fn concatenation() {
        let first: Queue = "IJ".parse().unwrap();
        let second: Queue = "SZ".parse().unwrap();
        assert_eq!(first.concat(second).to_string(), "IJSZ");
        assert_eq!(Queue::empty().concat(second), second);
        assert_eq!(first.concat(Queue::empty()), first);
    }

    #[test]
    fn natural_order() {
        let mut queues: Vec<Queue> = ["SZ", "I", "ZI", "II", "LLL", "Z"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        queues.sort_unstable_by_key(|q| q.natural_order_key());

        let sorted: Vec<String> = queues.iter().map(Queue::to_string).collect();
        assert_eq!(sorted, vec!["I", "Z", "II", "SZ", "ZI", "LLL"]);
    }
}
