//! Origin tags for log records
//!
//! A [`Tag`] is derived once per attachment from a [`CallStack`] of
//! [`CallFrame`]s, innermost frame first. Frames are captured at compile
//! time, either from the caller's source location (`#[track_caller]`) or from
//! the enclosing function path ([`call_site!`](crate::call_site)).
//!
//! Derivation of the base tag from a frame's scope path:
//! 1. strip trailing synthetic segments (`::{{closure}}`, `::{{constant}}`, ...)
//!    and, when any were stripped, the segment naming the function that owns them
//! 2. reduce `<T as Trait>` to `T` and drop generic arguments
//! 3. keep the last path segment
//! 4. cap to `max_tag_length` characters when the sink has a limit

use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;
use std::panic::Location;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::DebugConfig;
use crate::error::{DebugError, Result};

/// Trailing compiler-generated scope segments (closures, async blocks, consts)
static SYNTHETIC_SCOPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(::\{\{[a-z_]+\}\}(#\d+)?)+$").unwrap());

const PATH_SEPARATOR: &str = "::";

/// Directories under which source paths map onto module paths
const SOURCE_ROOTS: [&str; 4] = ["src", "tests", "benches", "examples"];

/// Immutable origin label shared by every subscription of one attachment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(Arc<str>);

impl Tag {
    pub fn new(tag: impl Into<Arc<str>>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Tag {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Tag {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Tag {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

/// One captured frame: the fully qualified scope the code runs in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    scope: Cow<'static, str>,
    file: &'static str,
    line: u32,
}

impl CallFrame {
    pub fn new(scope: impl Into<Cow<'static, str>>, file: &'static str, line: u32) -> Self {
        Self {
            scope: scope.into(),
            file,
            line,
        }
    }

    /// Frame of the caller, scoped by its source file's module path
    #[track_caller]
    pub fn caller() -> Self {
        Self::from_location(Location::caller())
    }

    pub fn from_location(location: &'static Location<'static>) -> Self {
        Self {
            scope: Cow::Owned(scope_from_path(location.file())),
            file: location.file(),
            line: location.line(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.scope, self.file, self.line)
    }
}

/// Frame for the enclosing function, resolved at compile time
///
/// The scope is the function's full path, including `{{closure}}` segments
/// when invoked inside closures or async blocks.
///
/// ```ignore
/// mod main_view {
///     pub fn on_click() -> stream_debug::CallFrame {
///         (|| stream_debug::call_site!())()
///     }
/// }
/// // scope: "my_crate::main_view::on_click::{{closure}}"
/// ```
#[macro_export]
macro_rules! call_site {
    () => {{
        fn __call_site() {}
        fn __type_name_of<T>(_: T) -> &'static str {
            ::core::any::type_name::<T>()
        }
        let name = __type_name_of(__call_site);
        $crate::CallFrame::new(
            name.strip_suffix("::__call_site").unwrap_or(name),
            file!(),
            line!(),
        )
    }};
}

/// Frames captured at attachment time, innermost first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallStack {
    frames: Vec<CallFrame>,
}

impl CallStack {
    pub fn new(frames: Vec<CallFrame>) -> Self {
        Self { frames }
    }

    /// Single-frame stack for the caller's location
    #[track_caller]
    pub fn caller() -> Self {
        Self::from(CallFrame::caller())
    }

    /// Append a frame on the caller side of the existing ones
    pub fn with_outer(mut self, frame: CallFrame) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    pub fn get(&self, depth: usize) -> Option<&CallFrame> {
        self.frames.get(depth)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl From<CallFrame> for CallStack {
    fn from(frame: CallFrame) -> Self {
        Self::new(vec![frame])
    }
}

impl FromIterator<CallFrame> for CallStack {
    fn from_iter<I: IntoIterator<Item = CallFrame>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Derives the [`Tag`] of an attachment from its call stack
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagResolver {
    depth_with_tag: usize,
    depth_without_tag: usize,
    max_tag_length: Option<usize>,
}

impl TagResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DebugConfig) -> Self {
        Self {
            depth_with_tag: config.frame_depth_with_tag,
            depth_without_tag: config.frame_depth_without_tag,
            max_tag_length: config.max_tag_length,
        }
    }

    /// Cap base tags to `max` characters (`None` disables truncation)
    pub fn with_max_tag_length(mut self, max: Option<usize>) -> Self {
        self.max_tag_length = max;
        self
    }

    pub fn with_frame_depths(mut self, with_tag: usize, without_tag: usize) -> Self {
        self.depth_with_tag = with_tag;
        self.depth_without_tag = without_tag;
        self
    }

    /// Stack index inspected for the given attachment path
    pub fn frame_depth(&self, has_explicit_tag: bool) -> usize {
        if has_explicit_tag {
            self.depth_with_tag
        } else {
            self.depth_without_tag
        }
    }

    /// Tag for one attachment: `base` or `"{base}: {explicit}"`
    ///
    /// Fails when the stack has no frame at the configured depth.
    pub fn resolve(&self, stack: &CallStack, explicit: Option<&str>) -> Result<Tag> {
        let depth = self.frame_depth(explicit.is_some());
        let frame = stack.get(depth).ok_or(DebugError::StackTooShallow {
            depth,
            available: stack.len(),
        })?;

        let base = self.base_tag(frame);
        let tag = match explicit {
            Some(explicit) => format!("{base}: {explicit}"),
            None => base,
        };
        tracing::trace!(target: "stream_debug::tag", frame = %frame, tag = %tag, "resolved tag");
        Ok(Tag::new(tag))
    }

    /// Base tag of a single frame (no explicit suffix)
    pub fn base_tag(&self, frame: &CallFrame) -> String {
        let name = named_scope(frame.scope());
        match self.max_tag_length {
            Some(max) if name.chars().count() > max => name.chars().take(max).collect(),
            _ => name,
        }
    }
}

/// Simple name of the nearest named scope of a qualified path
pub fn named_scope(scope: &str) -> String {
    let mut scope = scope;
    if let Some(synthetic) = SYNTHETIC_SCOPE.find(scope) {
        scope = &scope[..synthetic.start()];
        if let Some(idx) = scope.rfind(PATH_SEPARATOR) {
            scope = &scope[..idx];
        }
    }

    let path = strip_generic_args(&unwrap_qualified_self(scope));
    match path.rfind(PATH_SEPARATOR) {
        Some(idx) => path[idx + PATH_SEPARATOR.len()..].to_string(),
        None => path,
    }
}

/// `<a::Foo as a::Trait>::method` -> `a::Foo::method`
fn unwrap_qualified_self(path: &str) -> Cow<'_, str> {
    if !path.starts_with('<') {
        return Cow::Borrowed(path);
    }

    let mut depth = 0usize;
    for (idx, c) in path.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let inner = &path[1..idx];
                    let self_ty = inner.split(" as ").next().unwrap_or(inner);
                    return Cow::Owned(format!("{self_ty}{}", &path[idx + 1..]));
                }
            }
            _ => {}
        }
    }
    Cow::Borrowed(path)
}

fn strip_generic_args(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut depth = 0usize;
    for c in path.chars() {
        match c {
            '<' => depth += 1,
            '>' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Module path of a source file: `src/ui/main_view.rs` -> `ui::main_view`
pub fn scope_from_path(file: &str) -> String {
    let components: Vec<&str> = file
        .split(['/', '\\'])
        .filter(|c| !c.is_empty() && *c != ".")
        .collect();

    let start = components
        .iter()
        .rposition(|c| SOURCE_ROOTS.contains(c))
        .map(|idx| idx + 1)
        .unwrap_or(components.len().saturating_sub(1));

    let mut segments: Vec<&str> = components[start.min(components.len())..]
        .iter()
        .map(|c| c.strip_suffix(".rs").unwrap_or(c))
        .collect();

    if segments.len() > 1 && matches!(segments.last(), Some(&("mod" | "lib" | "main"))) {
        segments.pop();
    }
    segments.join(PATH_SEPARATOR)
}
