// MIT License
//
// Copyright (c) 2019 Lukas Lueg (lukas.lueg@gmail.com)
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! `flatpack` reflects over `#[repr(C)]` struct layouts at compile time and
//! uses that reflection to drive an exact binary codec (same schema on both
//! ends) and a versioned reader (source and sink schemas may differ --
//! members are matched by ordinal tag, not position).
//!
//! See the `flatpack_derive` crate for the `#[derive(Reflect)]` macro that
//! makes a struct participate in all of this.
//!
//! ```
//! use flatpack::exact::ExactCodec;
//!
//! #[derive(flatpack_derive::Reflect, Default)]
//! #[repr(C)]
//! struct Point {
//!     #[flatpack(tag = 0)]
//!     x: i32,
//!     #[flatpack(tag = 1)]
//!     y: i32,
//! }
//!
//! let mut buf = flatpack::stream::SliceWriter::new();
//! Point { x: 1, y: 2 }.write_exact(&mut buf).unwrap();
//! ```

#![recursion_limit = "256"]

pub mod category;
pub mod container;
pub mod error;
pub mod exact;
pub mod reflect;
pub mod schema;
pub mod skip;
pub mod stream;
pub mod versioned;

pub use category::TypeCategory;
pub use error::{Error, Result};
pub use exact::ExactCodec;
pub use reflect::Reflect;
pub use schema::Schema;
pub use versioned::{Options, VersionedCodec};
