//! Call-site provenance for diagnostics.
//!
//! A [`CallContext`] records where a diagnostic was issued: source file,
//! function, fully qualified function path, and line. Records copy the
//! context by value, so every string must live for the whole process.
//! Literal call sites get that for free; dynamic call sites (foreign
//! bridges reporting on behalf of another runtime) go through
//! [`CallContext::interned`], which leaks each distinct string exactly once.

use std::fmt;
use std::sync::LazyLock;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

/// Process-wide set of interned call-site strings.
static INTERNED: LazyLock<Mutex<FxHashSet<&'static str>>> =
    LazyLock::new(|| Mutex::new(FxHashSet::default()));

/// Intern a dynamically built string so it can back a [`CallContext`].
///
/// Repeated calls with equal contents return the same pointer.
pub fn intern(s: &str) -> &'static str {
    let mut set = INTERNED.lock();
    if let Some(&existing) = set.get(s) {
        return existing;
    }
    let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
    set.insert(leaked);
    leaked
}

/// Source location a diagnostic was issued from.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct CallContext {
    file: &'static str,
    function: &'static str,
    pretty_function: &'static str,
    line: u32,
    hidden: bool,
}

impl CallContext {
    /// Create a context from literal call-site data.
    pub const fn new(
        file: &'static str,
        function: &'static str,
        line: u32,
        pretty_function: &'static str,
    ) -> Self {
        CallContext {
            file,
            function,
            pretty_function,
            line,
            hidden: false,
        }
    }

    /// Create a context whose strings are not `'static`.
    ///
    /// The strings are interned; the fully qualified function path is the
    /// function name itself.
    pub fn interned(file: &str, function: &str, line: u32) -> Self {
        let function = intern(function);
        CallContext::new(intern(file), function, line, function)
    }

    /// Build a context from the type path of a marker fn nested in the caller.
    ///
    /// Used by [`call_context!`](crate::call_context). `path` looks like
    /// `my_crate::module::caller::__here`, possibly with `{{closure}}`
    /// segments in between.
    #[doc(hidden)]
    pub fn from_type_path(file: &'static str, line: u32, path: &'static str) -> Self {
        let pretty = path.strip_suffix("::__here").unwrap_or(path);
        let function = pretty
            .rsplit("::")
            .find(|segment| *segment != "{{closure}}")
            .unwrap_or(pretty);
        CallContext::new(file, function, line, pretty)
    }

    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn function(&self) -> &'static str {
        self.function
    }

    pub fn pretty_function(&self) -> &'static str {
        self.pretty_function
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// Whether this call site is hidden from stack-trace emphasis.
    ///
    /// Hidden contexts are echoed in the short form, without location.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Mark this call site as hidden.
    pub fn hide(&mut self) -> &mut Self {
        self.hidden = true;
        self
    }

    /// True when there is no usable location (no file or no function).
    pub fn is_empty(&self) -> bool {
        self.file.is_empty() || self.function.is_empty()
    }
}

impl fmt::Display for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "<unknown>");
        }
        write!(f, "{} at line {} of {}", self.function, self.line, self.file)
    }
}

/// Capture the [`CallContext`] of the current call site.
///
/// ```text
/// fn load_layer() {
///     let ctx = call_context!();
///     // ctx.function() == "load_layer"
/// }
/// ```
#[macro_export]
macro_rules! call_context {
    () => {{
        fn __here() {}
        $crate::CallContext::from_type_path(
            ::std::file!(),
            ::std::line!(),
            ::std::any::type_name_of_val(&__here),
        )
    }};
}
