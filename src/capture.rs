//! The snapshot pipeline: clone, embed fonts, inline images, serialize to an
//! SVG data URI and optionally rasterize it.

use futures::future::BoxFuture;
use futures::FutureExt;
use percent_encoding::percent_decode_str;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::clone_tree::{CloneElement, CloneNode};
use crate::cloner::{Cloner, NodeFilter};
use crate::config::Config;
use crate::dom::{Document, Namespace, NodeRef, SourceNode, XHTML_NAMESPACE};
use crate::error_handler::{ErrorHandler, ErrorHandlerChain, FailureDescriptor};
use crate::modifier::{Modifier, ModifierError, ModifierFilter, ModifierRegistry, Stage};
use crate::raster::{DecodedImage, ImageCanvasBackend, RasterBackend};
use crate::resource::{
    data_url, decode_data_url, is_data_url, Fetch, HttpTransport, ResourceFetcher, Transport,
};
use crate::{fonts, images, layout, Result, SnapshotError};

pub const SVG_DATA_URI_PREFIX: &str = "data:image/svg+xml;charset=utf-8,";

/// Per-capture options.
#[derive(Clone, Default)]
pub struct CaptureOptions {
    /// Nodes rejected by the filter are left out together with their subtree.
    pub filter: Option<NodeFilter>,
    /// CSS color painted behind the captured root.
    pub bgcolor: Option<String>,
    /// Modifier group to consult; defaults to the configured group.
    pub group: Option<String>,
}

impl fmt::Debug for CaptureOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureOptions")
            .field("filter", &self.filter.is_some())
            .field("bgcolor", &self.bgcolor)
            .field("group", &self.group)
            .finish()
    }
}

impl CaptureOptions {
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&dyn SourceNode) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn with_bgcolor(mut self, bgcolor: impl Into<String>) -> Self {
        self.bgcolor = Some(bgcolor.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// Progress of one capture, logged at each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Start,
    Cloned,
    FontsEmbedded,
    ImagesInlined,
    Serialized,
    Done,
    Failed,
}

/// The SVG data URI together with the size it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgCapture {
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Fetches through the shared fetcher, adding the capture group's error
/// handlers after the global chain.
struct ScopedFetcher<'a> {
    fetcher: &'a ResourceFetcher,
    extra: Vec<ErrorHandler>,
}

impl Fetch for ScopedFetcher<'_> {
    fn fetch<'b>(&'b self, url: &'b str) -> BoxFuture<'b, Result<String>> {
        self.fetcher.fetch_with(url, &self.extra).boxed()
    }
}

/// Owns the modifier registry, the error handler chain and the platform
/// collaborators. Captures running concurrently share the registries.
pub struct Snapshotter {
    registry: Arc<ModifierRegistry>,
    handlers: Arc<ErrorHandlerChain>,
    fetcher: ResourceFetcher,
    raster: Arc<dyn RasterBackend>,
    config: Config,
}

impl fmt::Debug for Snapshotter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshotter")
            .field("registry", &self.registry)
            .field("handlers", &self.handlers)
            .field("fetcher", &self.fetcher)
            .field("config", &self.config)
            .finish()
    }
}

impl Snapshotter {
    pub fn new(transport: Arc<dyn Transport>, raster: Arc<dyn RasterBackend>, config: Config) -> Self {
        let handlers = Arc::new(ErrorHandlerChain::new());
        let fetcher =
            ResourceFetcher::new(transport, handlers.clone()).with_timeout(config.fetch.timeout);
        Self {
            registry: Arc::new(ModifierRegistry::new()),
            handlers,
            fetcher,
            raster,
            config,
        }
    }

    /// HTTP transport and the `image` canvas backend.
    pub fn with_defaults(config: Config) -> Result<Self> {
        Ok(Self::new(
            Arc::new(HttpTransport::new()?),
            Arc::new(ImageCanvasBackend::new()),
            config,
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ModifierRegistry> {
        &self.registry
    }

    pub fn error_handlers(&self) -> &Arc<ErrorHandlerChain> {
        &self.handlers
    }

    pub fn fetcher(&self) -> &ResourceFetcher {
        &self.fetcher
    }

    /// Registers `modifier` for the stage named `stage`.
    pub fn register_modifier(
        &self,
        stage: &str,
        modifier: Modifier,
        filter: ModifierFilter,
        priority: i32,
        group: Option<&str>,
    ) -> Result<()> {
        self.registry
            .register_named(stage, modifier, filter, priority, group)
    }

    pub fn register_error_handler<F, Fut>(&self, handler: F)
    where
        F: Fn(FailureDescriptor) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Option<String>, ModifierError>> + Send + 'static,
    {
        self.handlers
            .register(Arc::new(move |failure| handler(failure).boxed()));
    }

    pub async fn to_svg(
        &self,
        document: &dyn Document,
        root: NodeRef,
        options: &CaptureOptions,
    ) -> Result<String> {
        Ok(self.capture_svg(document, root, options).await?.data_uri)
    }

    /// Like [`to_svg`](Self::to_svg), also reporting the declared size.
    pub async fn capture_svg(
        &self,
        document: &dyn Document,
        root: NodeRef,
        options: &CaptureOptions,
    ) -> Result<SvgCapture> {
        let outcome = self.render_svg(document, root, options).await;
        finish(outcome)
    }

    pub async fn to_png(
        &self,
        document: &dyn Document,
        root: NodeRef,
        options: &CaptureOptions,
    ) -> Result<String> {
        let canvas = self.draw(document, root, options).await?;
        canvas.to_data_url()
    }

    /// PNG bytes, taken straight from the canvas when it supports it and
    /// decoded from its data URL otherwise.
    pub async fn to_blob(
        &self,
        document: &dyn Document,
        root: NodeRef,
        options: &CaptureOptions,
    ) -> Result<Blob> {
        let canvas = self.draw(document, root, options).await?;
        let bytes = match canvas.to_blob() {
            Some(bytes) => bytes?,
            None => decode_data_url(&canvas.to_data_url()?)?.bytes,
        };
        Ok(Blob {
            bytes,
            mime_type: "image/png".to_string(),
        })
    }

    fn group<'a>(&'a self, options: &'a CaptureOptions) -> Option<&'a str> {
        options
            .group
            .as_deref()
            .or(self.config.default_group.as_deref())
    }

    async fn render_svg(
        &self,
        document: &dyn Document,
        root: NodeRef,
        options: &CaptureOptions,
    ) -> Result<SvgCapture> {
        let group = self.group(options);
        let strict = self.config.strict_resources;
        let fetch = ScopedFetcher {
            fetcher: &self.fetcher,
            extra: self.registry.error_handlers(group),
        };
        transition(CaptureState::Start, group);

        let mut clone = Cloner::new(&self.registry)
            .with_filter(options.filter.clone())
            .with_group(group)
            .clone_subtree(root.clone())
            .await
            .ok_or(SnapshotError::NothingToRender)?;
        transition(CaptureState::Cloned, group);

        let font_css = fonts::resolve_all(document, &fetch, strict).await?;
        if let Some(element) = clone.as_element_mut() {
            element.append_child(CloneElement::html("style").with_child(CloneNode::text(font_css)));
        }
        transition(CaptureState::FontsEmbedded, group);

        images::inline_all(&mut clone, &fetch, strict).await?;
        transition(CaptureState::ImagesInlined, group);

        if let Some(element) = clone.as_element_mut() {
            if let Some(bgcolor) = options.bgcolor.as_deref() {
                element.style.set_property("background-color", bgcolor, false);
            }
            for side in ["margin-bottom", "margin-top", "margin-left", "margin-right"] {
                element.style.set_property(side, "0px", false);
            }
            if element.namespace == Namespace::Html {
                element.set_attribute("xmlns", XHTML_NAMESPACE);
            }
        }

        let xml = self.apply_xml_modifiers(clone.to_xml()?, root.as_ref(), group);
        let width = layout::node_width(root.as_ref(), false);
        let height = layout::node_height(root.as_ref(), false);
        transition(CaptureState::Serialized, group);

        Ok(SvgCapture {
            data_uri: make_svg_data_uri(&xml, width, height),
            width,
            height,
        })
    }

    /// Runs the group's `xml` modifiers in registration order; each non-empty
    /// result replaces the running text, failures leave it unchanged.
    fn apply_xml_modifiers(&self, xml: String, root: &dyn SourceNode, group: Option<&str>) -> String {
        let mut xml = xml;
        for reg in self.registry.resolve(Stage::Xml, root, group) {
            let Modifier::Xml(callback) = &reg.modifier else {
                continue;
            };
            match callback(&xml) {
                Ok(Some(rewritten)) if !rewritten.is_empty() => xml = rewritten,
                Ok(_) => {}
                Err(err) => debug!(error = %err, "xml modifier failed"),
            }
        }
        xml
    }

    async fn draw(
        &self,
        document: &dyn Document,
        root: NodeRef,
        options: &CaptureOptions,
    ) -> Result<Box<dyn crate::raster::Canvas>> {
        let svg = self.capture_svg(document, root, options).await?;
        let image = self.make_image(&svg.data_uri, self.group(options)).await?;

        let settle = self.config.raster.settle_delay;
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }

        let mut canvas = self.raster.new_canvas(svg.width, svg.height);
        canvas.draw_image(&image, 0, 0);
        Ok(canvas)
    }

    /// Decodes the SVG data URI. On failure the error handlers are offered an
    /// `svg2img` failure; a payload they return is decoded and used instead
    /// (a `data:` URL, or base64 PNG bytes).
    async fn make_image(&self, uri: &str, group: Option<&str>) -> Result<DecodedImage> {
        let err = match self.raster.decode(uri).await {
            Ok(image) => return Ok(image),
            Err(err) => err,
        };
        warn!(error = %err, "failed to generate image from svg");

        let failure = FailureDescriptor::svg2img(uri);
        let extra = self.registry.error_handlers(group);
        let Some(payload) = self.handlers.recover_with(&failure, &extra).await else {
            return Err(SnapshotError::decode(err.to_string()));
        };

        let fallback = if is_data_url(&payload) {
            payload
        } else {
            data_url(&payload, "image/png")
        };
        self.raster
            .decode(&fallback)
            .await
            .map_err(|e| SnapshotError::decode(format!("{err}; fallback image: {e}")))
    }
}

fn transition(state: CaptureState, group: Option<&str>) {
    debug!(?state, group = group.unwrap_or("<default>"), "capture state");
}

fn finish(outcome: Result<SvgCapture>) -> Result<SvgCapture> {
    match &outcome {
        Ok(svg) => debug!(
            state = ?CaptureState::Done,
            width = svg.width,
            height = svg.height,
            bytes = svg.data_uri.len(),
            "capture state"
        ),
        Err(err) => debug!(state = ?CaptureState::Failed, error = %err, "capture state"),
    }
    outcome
}

/// `#` and newlines would end or corrupt an unencoded data URI. `%` is
/// escaped first so literal escape sequences in the text survive decoding.
pub fn escape_xhtml(xml: &str) -> String {
    xml.replace('%', "%25")
        .replace('#', "%23")
        .replace('\n', "%0A")
}

pub fn make_svg_data_uri(xml: &str, width: u32, height: u32) -> String {
    let foreign_object = format!(
        r#"<foreignObject x="0" y="0" width="100%" height="100%">{}</foreignObject>"#,
        escape_xhtml(xml)
    );
    let svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}">{foreign_object}</svg>"#
    );
    format!("{SVG_DATA_URI_PREFIX}{svg}")
}

/// Markup of an SVG data URI from [`make_svg_data_uri`], percent-decoded the
/// way a browser reads it. `None` for other URIs or non UTF-8 payloads.
pub fn svg_markup(data_uri: &str) -> Option<String> {
    let body = data_uri.strip_prefix(SVG_DATA_URI_PREFIX)?;
    percent_decode_str(body)
        .decode_utf8()
        .ok()
        .map(|markup| markup.into_owned())
}
