// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Logging macros that compile to nothing unless the `tracing` feature is on.

#[cfg(feature = "tracing")]
pub use tracing::{debug, trace, warn};

#[cfg(not(feature = "tracing"))]
mod noop {
    // Named apart from the built-in `warn` attribute, which a `macro_rules!
    // warn` would be ambiguous with.
    macro_rules! noop_debug {
        ($($arg:tt)*) => {};
    }
    macro_rules! noop_trace {
        ($($arg:tt)*) => {};
    }
    macro_rules! noop_warn {
        ($($arg:tt)*) => {};
    }
    pub(crate) use {noop_debug as debug, noop_trace as trace, noop_warn as warn};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use noop::*;
