//! Module `frame` reconciles the length a caller declares for a transfer
//! with the storage it actually supplied, and splits memory-style writes
//! into page-sized chunks.

use core::ops::Range;

/// `MAX_TRANSFER` is the longest transfer the driver can express; lengths
/// travel as 16-bit counts.
pub const MAX_TRANSFER: usize = u16::MAX as usize;

/// `MAX_SLAVE_RESPONSE` is the longest canned response the adapter can hold
/// for a slave-mode read by an external master.
pub const MAX_SLAVE_RESPONSE: usize = 64;

/// `clamp` returns the number of bytes that may actually be transferred
/// when a caller asks for `requested` bytes using a buffer of `capacity`.
pub fn clamp(requested: usize, capacity: usize) -> usize {
    requested.min(capacity).min(MAX_TRANSFER)
}

/// `Transfer` reports how much of a read-style transfer completed.
///
/// A short transfer is not an error. Callers that need the full amount
/// should check `is_complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    /// The length the caller asked for, after clamping to the buffer.
    pub requested: usize,
    /// The number of bytes actually moved.
    pub actual: usize,
}

impl Transfer {
    pub(crate) fn new(requested: usize, reported: u32) -> Transfer {
        Transfer {
            requested,
            actual: (reported as usize).min(requested),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.actual == self.requested
    }

    pub fn is_empty(&self) -> bool {
        self.actual == 0
    }
}

/// `Page` is one chunk of a paged memory write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Device address the chunk starts at.
    pub offset: u32,
    /// Range of the caller's data carried by this chunk.
    pub data: Range<usize>,
}

/// `pages` splits a write of `len` bytes starting at device address `start`
/// into chunks that never cross a `page_size` boundary.
///
/// The first chunk starts at `start`; every later chunk starts on a page
/// boundary. A `page_size` of zero means the memory is not paged, so the
/// whole write is one chunk.
pub fn pages(start: u32, len: usize, page_size: usize) -> Pages {
    Pages {
        offset: start,
        done: 0,
        len,
        page_size,
    }
}

/// Iterator returned by `pages`.
#[derive(Debug, Clone)]
pub struct Pages {
    offset: u32,
    done: usize,
    len: usize,
    page_size: usize,
}

impl Iterator for Pages {
    type Item = Page;

    fn next(&mut self) -> Option<Page> {
        if self.done >= self.len {
            return None;
        }
        let left = self.len - self.done;
        let size = match self.page_size {
            0 => left,
            page => (page - self.offset as usize % page).min(left),
        };
        let page = Page {
            offset: self.offset,
            data: self.done..self.done + size,
        };
        self.offset = self.offset.wrapping_add(size as u32);
        self.done += size;
        Some(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_never_exceeds_either_bound() {
        for n in [0usize, 1, 7, 8, 9, 255, 70_000].iter().copied() {
            for c in [0usize, 1, 8, 64, 65_535, 100_000].iter().copied() {
                let got = clamp(n, c);
                assert!(got <= n && got <= c, "clamp({}, {}) = {}", n, c, got);
                assert!(got <= MAX_TRANSFER);
                if n.min(c) <= MAX_TRANSFER {
                    assert_eq!(got, n.min(c));
                }
            }
        }
    }

    #[test]
    fn transfer_counts_are_bounded_by_request() {
        let t = Transfer::new(4, 9);
        assert_eq!(t.actual, 4);
        assert!(t.is_complete());

        let t = Transfer::new(4, 3);
        assert!(!t.is_complete());
        assert!(!t.is_empty());

        assert!(Transfer::new(4, 0).is_empty());
    }

    #[test]
    fn pages_split_on_boundaries() {
        let got: Vec<Page> = pages(5, 14, 8).collect();
        assert_eq!(
            got,
            vec![
                Page { offset: 5, data: 0..3 },
                Page { offset: 8, data: 3..11 },
                Page { offset: 16, data: 11..14 },
            ]
        );
    }

    #[test]
    fn aligned_pages() {
        let got: Vec<Page> = pages(32, 64, 32).collect();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].offset, 32);
        assert_eq!(got[1].offset, 64);
        assert_eq!(got[1].data, 32..64);
    }

    #[test]
    fn no_pages_for_empty_write() {
        assert_eq!(pages(3, 0, 8).count(), 0);
    }

    #[test]
    fn odd_page_sizes_split_on_boundaries() {
        let got: Vec<Page> = pages(0, 72, 24).collect();
        assert_eq!(
            got,
            vec![
                Page { offset: 0, data: 0..24 },
                Page { offset: 24, data: 24..48 },
                Page { offset: 48, data: 48..72 },
            ]
        );

        let got: Vec<Page> = pages(10, 40, 24).collect();
        assert_eq!(
            got,
            vec![
                Page { offset: 10, data: 0..14 },
                Page { offset: 24, data: 14..38 },
                Page { offset: 48, data: 38..40 },
            ]
        );
    }

    #[test]
    fn zero_page_size_is_one_chunk() {
        let got: Vec<Page> = pages(7, 300, 0).collect();
        assert_eq!(got, vec![Page { offset: 7, data: 0..300 }]);
        assert_eq!(pages(7, 0, 0).count(), 0);
    }

    #[test]
    fn every_chunk_stays_within_its_page() {
        for &page in [1usize, 3, 8, 24, 32].iter() {
            for start in 0..50u32 {
                for len in 0..80usize {
                    let mut total = 0;
                    for (i, p) in pages(start, len, page).enumerate() {
                        let size = p.data.len();
                        assert!(size > 0 && size <= page);
                        assert_eq!(p.data.start, total);
                        if i == 0 {
                            assert_eq!(p.offset, start);
                        } else {
                            assert_eq!(p.offset as usize % page, 0);
                        }
                        assert!(
                            (p.offset as usize % page) + size <= page,
                            "pages({}, {}, {}) crossed a boundary at {:?}",
                            start,
                            len,
                            page,
                            p
                        );
                        total += size;
                    }
                    assert_eq!(total, len);
                }
            }
        }
    }
}
