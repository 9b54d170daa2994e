//! Key-by-key comparison of two CSA blocks.

use super::header::{Element, HeaderBlock};
use std::cmp::Ordering;
use std::fmt;

/// One difference between two blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderDiff<'a> {
    /// Present only in the left block.
    OnlyLeft(&'a str, &'a Element),
    /// Present only in the right block.
    OnlyRight(&'a str, &'a Element),
    /// Present in both with different contents.
    Changed {
        /// Element name.
        name: &'a str,
        /// Left element.
        left: &'a Element,
        /// Right element.
        right: &'a Element,
    },
}

impl HeaderDiff<'_> {
    /// Element name the difference refers to.
    pub fn name(&self) -> &str {
        match self {
            Self::OnlyLeft(name, _) | Self::OnlyRight(name, _) => name,
            Self::Changed { name, .. } => name,
        }
    }
}

impl fmt::Display for HeaderDiff<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnlyLeft(name, e) => write!(f, "< {name}: {e:?}"),
            Self::OnlyRight(name, e) => write!(f, "> {name}: {e:?}"),
            Self::Changed { name, left, right } => {
                write!(f, "< {name}: {left:?}\n> {name}: {right:?}")
            }
        }
    }
}

/// Compare two blocks, walking both key sets in sorted order.
pub fn diff<'a>(left: &'a HeaderBlock, right: &'a HeaderBlock) -> Vec<HeaderDiff<'a>> {
    let mut lkeys: Vec<&str> = left.keys().collect();
    let mut rkeys: Vec<&str> = right.keys().collect();
    lkeys.sort_unstable();
    rkeys.sort_unstable();

    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < lkeys.len() && j < rkeys.len() {
        let (lk, rk) = (lkeys[i], rkeys[j]);
        match lk.cmp(rk) {
            Ordering::Less => {
                out.push(HeaderDiff::OnlyLeft(lk, &left[lk]));
                i += 1;
            }
            Ordering::Greater => {
                out.push(HeaderDiff::OnlyRight(rk, &right[rk]));
                j += 1;
            }
            Ordering::Equal => {
                let (l, r) = (&left[lk], &right[rk]);
                if l != r {
                    out.push(HeaderDiff::Changed {
                        name: lk,
                        left: l,
                        right: r,
                    });
                }
                i += 1;
                j += 1;
            }
        }
    }
    out.extend(lkeys[i..].iter().map(|&k| HeaderDiff::OnlyLeft(k, &left[k])));
    out.extend(rkeys[j..].iter().map(|&k| HeaderDiff::OnlyRight(k, &right[k])));
    out
}
