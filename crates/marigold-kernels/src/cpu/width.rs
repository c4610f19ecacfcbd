//! Channel-width specialization.
//!
//! Kernels whose innermost loop runs over channels are written once, generic
//! over [`Width`]. [`Fixed`] carries the count as a const generic so the
//! compiler sees a constant trip count and can unroll and vectorize;
//! [`Dynamic`] carries it at run time and serves every other width.
//! [`dispatch_width!`](crate::dispatch_width) picks between them.

use marigold_common::KernelError;

/// Widths that get a dedicated `Fixed` instantiation.
pub const SPECIALIZED_WIDTHS: [usize; 10] = [8, 16, 24, 32, 48, 64, 96, 128, 192, 256];

/// A channel count, known either at compile time or at run time.
pub trait Width: Copy {
    fn get(self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fixed<const C: usize>;

impl<const C: usize> Width for Fixed<C> {
    #[inline(always)]
    fn get(self) -> usize {
        C
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dynamic(pub usize);

impl Width for Dynamic {
    #[inline(always)]
    fn get(self) -> usize {
        self.0
    }
}

/// A channel count that is one of [`SPECIALIZED_WIDTHS`].
///
/// Unsupported widths still run through the [`Dynamic`] path; this type is
/// for callers that want to reject them up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedWidth(usize);

impl SupportedWidth {
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl TryFrom<usize> for SupportedWidth {
    type Error = KernelError;

    fn try_from(channels: usize) -> Result<Self, Self::Error> {
        if SPECIALIZED_WIDTHS.contains(&channels) {
            Ok(Self(channels))
        } else {
            Err(KernelError::UnsupportedWidth { channels })
        }
    }
}

/// Run `$body` with `$w` bound to the `Fixed` instantiation for `$channels`,
/// falling back to `Dynamic` for widths outside [`SPECIALIZED_WIDTHS`].
#[macro_export]
macro_rules! dispatch_width {
    ($channels:expr, |$w:ident| $body:expr) => {{
        use $crate::cpu::width::{Dynamic, Fixed};
        match $channels {
            8 => { let $w = Fixed::<8>; $body }
            16 => { let $w = Fixed::<16>; $body }
            24 => { let $w = Fixed::<24>; $body }
            32 => { let $w = Fixed::<32>; $body }
            48 => { let $w = Fixed::<48>; $body }
            64 => { let $w = Fixed::<64>; $body }
            96 => { let $w = Fixed::<96>; $body }
            128 => { let $w = Fixed::<128>; $body }
            192 => { let $w = Fixed::<192>; $body }
            256 => { let $w = Fixed::<256>; $body }
            other => { let $w = Dynamic(other); $body }
        }
    }};
}
