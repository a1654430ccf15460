//! DOM Snapshot Library
//!
//! Captures a subtree of a rendered document as a self-contained image: the
//! subtree is deep-cloned with its computed styles, pseudo-elements and form
//! state, web fonts and images are inlined as `data:` URLs, and the result is
//! wrapped in an SVG `foreignObject`. The SVG can be rasterized to PNG
//! through a pluggable canvas backend.
//!
//! # Module Overview
//!
//! - [`capture`] - the [`Snapshotter`] pipeline (SVG, PNG and blob output)
//! - [`cloner`] - recursive node cloning with modifier overrides
//! - [`modifier`] - named groups of clone/style/error/xml overrides
//! - [`error_handler`] - fallbacks consulted when a fetch or decode fails
//! - [`resource`] - fetching with timeout, MIME inference, data URLs
//! - [`inliner`] / [`fonts`] / [`images`] - CSS `url()`, `@font-face` and image inlining
//! - [`dom`] - the traits a document platform implements
//! - [`snapshot`] - a document platform backed by a JSON page capture
//! - [`raster`] - decoding and canvas traits, with an `image`-crate backend
//! - [`plugins`] - ready-made modifiers
//! - [`config`] - configuration file support
//! - [`output`] - JSON output schemas
//!
//! # Example
//!
//! ```no_run
//! use domsnap::{CaptureOptions, Config, Document, PageSnapshot, Snapshotter};
//!
//! # async fn example() -> domsnap::Result<()> {
//! let page = PageSnapshot::load("page.json".as_ref())?;
//! let root = page.query_selector("#app").expect("#app in snapshot");
//!
//! let snapshotter = Snapshotter::with_defaults(Config::default())?;
//! let options = CaptureOptions::default().with_bgcolor("white");
//! let svg = snapshotter.to_svg(&page, root, &options).await?;
//! assert!(svg.starts_with("data:image/svg+xml"));
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod clone_tree;
pub mod cloner;
pub mod config;
pub mod dom;
pub mod error;
pub mod error_handler;
pub mod fonts;
pub mod images;
pub mod inliner;
pub mod layout;
pub mod modifier;
pub mod output;
pub mod plugins;
pub mod raster;
pub mod resource;
pub mod snapshot;

pub use capture::{
    make_svg_data_uri, svg_markup, Blob, CaptureOptions, CaptureState, Snapshotter, SvgCapture,
    SVG_DATA_URI_PREFIX,
};
pub use clone_tree::{CloneElement, CloneNode};
pub use cloner::{Cloner, NodeFilter, ATTRIBUTE_ALLOW_LIST};
pub use config::Config;
pub use dom::{
    ComputedStyle, CssRule, Document, InlineStyle, Namespace, NodeKind, NodeRef, PseudoElement,
    SheetAccessError, SourceNode, StyleSheet,
};
pub use error::{ErrorCategory, ErrorPayload, Result, SnapshotError};
pub use error_handler::{ErrorHandler, ErrorHandlerChain, FailureDescriptor};
pub use modifier::{
    Modifier, ModifierError, ModifierFilter, ModifierOutcome, ModifierRegistry, Stage,
};
pub use output::{CaptureOutput, ErrorOutput, SnapOutput, OUTPUT_VERSION};
pub use raster::{
    Canvas, DecodeError, DecodedImage, ImageCanvas, ImageCanvasBackend, ImageDecoder,
    RasterBackend,
};
pub use resource::{
    Fetch, FetchFn, HttpTransport, ResourceFetcher, Transport, TransportError,
    DEFAULT_FETCH_TIMEOUT,
};
pub use snapshot::PageSnapshot;
