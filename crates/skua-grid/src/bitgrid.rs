use enumset::EnumSet;

use crate::Direction;

/// Bit-packed traversability map.
///
/// Rows are stored as whole 64-bit words so scans can process 64 cells at a
/// time. The map is padded with an untraversable border: one row above and
/// below, and at least one column on each side (the row stride is rounded up
/// to a multiple of 64). Reads are therefore allowed one cell out of bounds
/// in every direction and report untraversable there.
pub struct BitGrid {
    width: i32,
    height: i32,
    words_per_row: usize,
    words: Box<[u64]>,
}

impl BitGrid {
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0, "width must be positive");
        assert!(height > 0, "height must be positive");
        assert!(width < 2_000_000_000, "width too large");
        assert!(height < 2_000_000_000, "height too large");
        let words_per_row = (width as usize + 2 + 63) / 64;
        let words = vec![0; words_per_row * (height as usize + 2)].into_boxed_slice();
        BitGrid {
            width,
            height,
            words_per_row,
            words,
        }
    }

    #[inline(always)]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline(always)]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Number of words storing each (padded) row.
    #[inline(always)]
    pub fn words_per_row(&self) -> usize {
        self.words_per_row
    }

    /// Whether `(x, y)` is traversable. Allows reads one cell into the
    /// padding border, which is never traversable.
    #[inline(always)]
    #[track_caller]
    pub fn get(&self, x: i32, y: i32) -> bool {
        assert!(x >= -1 && x <= self.width, "x out of bounds");
        assert!(y >= -1 && y <= self.height, "y out of bounds");
        // SAFETY: bounds just checked.
        unsafe { self.get_unchecked(x, y) }
    }

    /// # Safety
    /// `x` must be in `-1..=width` and `y` in `-1..=height`.
    #[inline(always)]
    #[cfg_attr(debug_assertions, track_caller)]
    pub unsafe fn get_unchecked(&self, x: i32, y: i32) -> bool {
        debug_assert!(x >= -1 && x <= self.width, "x out of bounds");
        debug_assert!(y >= -1 && y <= self.height, "y out of bounds");
        let (word, bit) = self.word_index(x, y);
        // SAFETY: padded coordinates index within the storage.
        unsafe { self.words.get_unchecked(word) & 1 << bit != 0 }
    }

    #[inline(always)]
    #[track_caller]
    pub fn set(&mut self, x: i32, y: i32, traversable: bool) {
        assert!(x >= 0 && x < self.width, "x out of bounds");
        assert!(y >= 0 && y < self.height, "y out of bounds");
        let (word, bit) = self.word_index(x, y);
        if traversable {
            self.words[word] |= 1 << bit;
        } else {
            self.words[word] &= !(1 << bit);
        }
    }

    /// The set of traversable neighbors of `(x, y)`.
    #[inline]
    #[track_caller]
    pub fn get_neighborhood(&self, x: i32, y: i32) -> EnumSet<Direction> {
        assert!(x >= 0 && x < self.width, "x out of bounds");
        assert!(y >= 0 && y < self.height, "y out of bounds");
        let mut neighborhood = EnumSet::new();
        for dir in EnumSet::<Direction>::all() {
            let (dx, dy) = dir.vector();
            // SAFETY: one step from an in-bounds cell stays within padding.
            if unsafe { self.get_unchecked(x + dx, y + dy) } {
                neighborhood |= dir;
            }
        }
        neighborhood
    }

    /// The word within the row containing column `x`, and `x`'s bit offset
    /// in it.
    #[inline(always)]
    pub fn word_offset(&self, x: i32) -> (usize, u32) {
        let px = (x + 1) as usize;
        (px / 64, px as u32 % 64)
    }

    /// The unpadded x coordinate of bit 0 of word `word_x`.
    #[inline(always)]
    pub fn word_base(&self, word_x: usize) -> i32 {
        word_x as i32 * 64 - 1
    }

    /// Reads the words at horizontal position `word_x` of the rows above, at,
    /// and below row `y`.
    ///
    /// # Safety
    /// `y` must be in `0..height` and `word_x` in `0..words_per_row`.
    #[inline(always)]
    pub unsafe fn word_triple(&self, word_x: usize, y: i32) -> [u64; 3] {
        debug_assert!(y >= 0 && y < self.height, "y out of bounds");
        debug_assert!(word_x < self.words_per_row, "word_x out of bounds");
        let row = y as usize + 1;
        // SAFETY: rows row-1, row, row+1 all exist thanks to the padding
        // rows, and word_x is within the row stride.
        unsafe {
            [
                *self.words.get_unchecked((row - 1) * self.words_per_row + word_x),
                *self.words.get_unchecked(row * self.words_per_row + word_x),
                *self.words.get_unchecked((row + 1) * self.words_per_row + word_x),
            ]
        }
    }

    /// Bytes of memory in use by the map.
    pub fn mem(&self) -> usize {
        self.words.len() * 8
    }

    #[inline(always)]
    fn word_index(&self, x: i32, y: i32) -> (usize, u32) {
        let px = (x + 1) as usize;
        let py = (y + 1) as usize;
        (py * self.words_per_row + px / 64, px as u32 % 64)
    }
}

#[test]
fn padding_is_untraversable() {
    let mut map = BitGrid::new(8, 4);
    for y in 0..4 {
        for x in 0..8 {
            map.set(x, y, true);
        }
    }
    assert!(map.get(0, 0));
    assert!(!map.get(-1, 0));
    assert!(!map.get(8, 0));
    assert!(!map.get(3, -1));
    assert!(!map.get(3, 4));
}

#[test]
fn wide_rows_span_words() {
    let mut map = BitGrid::new(100, 2);
    assert_eq!(map.words_per_row(), 2);
    map.set(70, 1, true);
    assert!(map.get(70, 1));
    assert!(!map.get(69, 1));
    let (word_x, bit) = map.word_offset(70);
    assert_eq!(word_x, 1);
    assert_eq!(bit, 7);
    assert_eq!(map.word_base(word_x) + bit as i32, 70);
    // SAFETY: row 1 and word 1 are in-bounds.
    let [above, row, below] = unsafe { map.word_triple(word_x, 1) };
    assert_eq!(above, 0);
    assert_eq!(row, 1 << 7);
    assert_eq!(below, 0);
}

#[test]
fn neighborhood_respects_borders() {
    let mut map = BitGrid::new(3, 3);
    for y in 0..3 {
        for x in 0..3 {
            map.set(x, y, true);
        }
    }
    map.set(1, 0, false);
    let nb = map.get_neighborhood(1, 1);
    assert!(!nb.contains(Direction::North));
    assert!(nb.contains(Direction::South));
    assert!(nb.contains(Direction::NorthWest));
    let corner = map.get_neighborhood(0, 0);
    assert!(!corner.contains(Direction::West));
    assert!(!corner.contains(Direction::NorthEast));
    assert!(corner.contains(Direction::East));
}
