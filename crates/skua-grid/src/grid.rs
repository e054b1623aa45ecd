use std::ops::{Index, IndexMut};

/// Dense row-major 2D array indexed by `(x, y)`.
pub struct Grid<T> {
    width: i32,
    height: i32,
    data: Box<[T]>,
}

impl<T> Grid<T> {
    /// Creates a grid with each cell initialized by `init(x, y)`.
    pub fn new(width: i32, height: i32, mut init: impl FnMut(i32, i32) -> T) -> Self {
        assert!(width > 0, "width must be positive");
        assert!(height > 0, "height must be positive");
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| init(x, y))
            .collect();
        Grid {
            width,
            height,
            data,
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

    /// The backing storage in row-major order.
    pub fn storage(&self) -> &[T] {
        &self.data
    }

    pub fn storage_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// # Safety
    /// `x` and `y` must be in-bounds.
    #[inline(always)]
    #[cfg_attr(debug_assertions, track_caller)]
    pub unsafe fn get_unchecked(&self, x: i32, y: i32) -> &T {
        self.bounds_check(x, y);
        // SAFETY: guaranteed by the caller.
        unsafe { self.data.get_unchecked(self.index(x, y)) }
    }

    /// # Safety
    /// `x` and `y` must be in-bounds.
    #[inline(always)]
    #[cfg_attr(debug_assertions, track_caller)]
    pub unsafe fn get_unchecked_mut(&mut self, x: i32, y: i32) -> &mut T {
        self.bounds_check(x, y);
        let index = self.index(x, y);
        // SAFETY: guaranteed by the caller.
        unsafe { self.data.get_unchecked_mut(index) }
    }

    #[inline(always)]
    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline(always)]
    #[cfg_attr(debug_assertions, track_caller)]
    fn bounds_check(&self, x: i32, y: i32) {
        debug_assert!(x >= 0 && x < self.width, "x out of bounds");
        debug_assert!(y >= 0 && y < self.height, "y out of bounds");
    }
}

impl<T> Index<(i32, i32)> for Grid<T> {
    type Output = T;

    #[inline(always)]
    #[track_caller]
    fn index(&self, (x, y): (i32, i32)) -> &T {
        assert!(x >= 0 && x < self.width, "x out of bounds");
        assert!(y >= 0 && y < self.height, "y out of bounds");
        &self.data[self.index(x, y)]
    }
}

impl<T> IndexMut<(i32, i32)> for Grid<T> {
    #[inline(always)]
    #[track_caller]
    fn index_mut(&mut self, (x, y): (i32, i32)) -> &mut T {
        assert!(x >= 0 && x < self.width, "x out of bounds");
        assert!(y >= 0 && y < self.height, "y out of bounds");
        let index = self.index(x, y);
        &mut self.data[index]
    }
}

#[test]
fn init_coordinates_are_row_major() {
    let grid = Grid::new(3, 2, |x, y| (x, y));
    assert_eq!(grid.storage()[0], (0, 0));
    assert_eq!(grid.storage()[2], (2, 0));
    assert_eq!(grid.storage()[3], (0, 1));
    assert_eq!(grid[(1, 1)], (1, 1));
}
