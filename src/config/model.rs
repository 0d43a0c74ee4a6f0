// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Directory under the project root for internal pipeline state
/// (staged intermediates, the deploy checkout).
pub const INTERNAL_DIR: &str = ".musashi";

/// Top-level configuration as read from `Musashi.toml`.
///
/// Every section is optional; the defaults reproduce the canonical project
/// layout, so a project that follows it needs no config file at all:
///
/// ```toml
/// [paths]
/// stylesheet_entry = "assets/sass/musashi.scss"
/// scripts_dir = "assets/js"
///
/// [output]
/// build_dir = "build"
/// styleguide_dir = "styleguide"
///
/// [[watch.bindings]]
/// patterns = ["assets/sass/**/*.scss"]
/// tasks = ["styles", "styleguide"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// Input locations from `[paths]`.
    #[serde(default)]
    pub paths: PathsSection,

    /// Output locations and bundle naming from `[output]`.
    #[serde(default)]
    pub output: OutputSection,

    /// CSS post-processing options from `[styles]`.
    #[serde(default)]
    pub styles: StylesSection,

    /// External tool commands from `[tools]`.
    #[serde(default)]
    pub tools: ToolsSection,

    /// Live-reload server options from `[server]`.
    #[serde(default)]
    pub server: ServerSection,

    /// Publishing options from `[deploy]`.
    #[serde(default)]
    pub deploy: DeploySection,

    /// Watch bindings and options from `[watch]`.
    #[serde(default)]
    pub watch: WatchSection,

    /// Project root directory all relative paths are resolved against.
    ///
    /// Not part of the TOML surface; the loader fills it in from the config
    /// file location (or the current directory when running on defaults).
    #[serde(skip, default = "default_root")]
    pub root: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            paths: PathsSection::default(),
            output: OutputSection::default(),
            styles: StylesSection::default(),
            tools: ToolsSection::default(),
            server: ServerSection::default(),
            deploy: DeploySection::default(),
            watch: WatchSection::default(),
            root: default_root(),
        }
    }
}

impl ConfigFile {
    /// `<root>/<build_dir>`.
    pub fn build_dir(&self) -> PathBuf {
        self.root.join(&self.output.build_dir)
    }

    /// `<root>/<build_dir>/js`.
    pub fn build_js_dir(&self) -> PathBuf {
        self.build_dir().join("js")
    }

    /// `<root>/<build_dir>/css`.
    pub fn build_css_dir(&self) -> PathBuf {
        self.build_dir().join("css")
    }

    /// `<root>/<styleguide_dir>`.
    pub fn styleguide_dir(&self) -> PathBuf {
        self.root.join(&self.output.styleguide_dir)
    }

    /// Scratch directory for staged intermediates.
    pub fn stage_dir(&self) -> PathBuf {
        self.root.join(INTERNAL_DIR).join("stage")
    }

    /// Scratch checkout used when publishing the style guide.
    pub fn deploy_stage_dir(&self) -> PathBuf {
        self.root.join(INTERNAL_DIR).join("deploy")
    }

    pub fn stylesheet_entry(&self) -> PathBuf {
        self.root.join(&self.paths.stylesheet_entry)
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.root.join(&self.paths.scripts_dir)
    }

    pub fn styleguide_config(&self) -> PathBuf {
        self.root.join(&self.paths.styleguide_config)
    }

    pub fn vendor_script_paths(&self) -> Vec<PathBuf> {
        self.paths
            .vendor_scripts
            .iter()
            .map(|p| self.root.join(p))
            .collect()
    }

    pub fn css_bundle_name(&self) -> String {
        format!("{}.css", self.output.bundle_name)
    }

    pub fn js_bundle_name(&self) -> String {
        format!("{}.js", self.output.bundle_name)
    }

    pub fn js_min_bundle_name(&self) -> String {
        format!("{}.min.js", self.output.bundle_name)
    }
}

/// `[paths]` section: where the pipeline reads its inputs from.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    /// Third-party scripts concatenated into the vendor bundle, in order.
    #[serde(default = "default_vendor_scripts")]
    pub vendor_scripts: Vec<String>,

    /// Entry point handed to the SCSS compiler.
    #[serde(default = "default_stylesheet_entry")]
    pub stylesheet_entry: String,

    /// Directory scanned (non-recursively) for application scripts.
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: String,

    /// Extension filter applied when scanning `scripts_dir`.
    #[serde(default = "default_script_extension")]
    pub script_extension: String,

    /// YAML config handed to the style-guide generator.
    #[serde(default = "default_styleguide_config")]
    pub styleguide_config: String,
}

fn default_vendor_scripts() -> Vec<String> {
    vec![
        "bower_components/angular/angular.js".to_string(),
        "bower_components/polymer/polymer.js".to_string(),
    ]
}

fn default_stylesheet_entry() -> String {
    "assets/sass/musashi.scss".to_string()
}

fn default_scripts_dir() -> String {
    "assets/js".to_string()
}

fn default_script_extension() -> String {
    "js".to_string()
}

fn default_styleguide_config() -> String {
    "hologram_config.yml".to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            vendor_scripts: default_vendor_scripts(),
            stylesheet_entry: default_stylesheet_entry(),
            scripts_dir: default_scripts_dir(),
            script_extension: default_script_extension(),
            styleguide_config: default_styleguide_config(),
        }
    }
}

/// `[output]` section: where artifacts land and what they are called.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputSection {
    #[serde(default = "default_build_dir")]
    pub build_dir: String,

    #[serde(default = "default_styleguide_dir")]
    pub styleguide_dir: String,

    /// Base name for the app bundles (`<name>.js`, `<name>.min.js`,
    /// `<name>.css`).
    #[serde(default = "default_bundle_name")]
    pub bundle_name: String,

    /// File name of the minified vendor bundle.
    #[serde(default = "default_vendor_bundle")]
    pub vendor_bundle: String,
}

fn default_build_dir() -> String {
    "build".to_string()
}

fn default_styleguide_dir() -> String {
    "styleguide".to_string()
}

fn default_bundle_name() -> String {
    "musashi".to_string()
}

fn default_vendor_bundle() -> String {
    "vendors.min.js".to_string()
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            build_dir: default_build_dir(),
            styleguide_dir: default_styleguide_dir(),
            bundle_name: default_bundle_name(),
            vendor_bundle: default_vendor_bundle(),
        }
    }
}

/// `[styles]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StylesSection {
    /// Browserslist queries exported to the prefixer via `BROWSERSLIST`.
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
}

fn default_browsers() -> Vec<String> {
    [
        "last 2 versions",
        "safari 5",
        "ie 8",
        "ie 9",
        "opera 12.1",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            browsers: default_browsers(),
        }
    }
}

/// A single external tool invocation: the command plus its base arguments.
/// Task code appends the input/output paths per call.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolSpec {
    pub cmd: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolSpec {
    pub fn new(cmd: impl Into<String>, args: &[&str]) -> Self {
        Self {
            cmd: cmd.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// `[tools]` section: every external binary the pipeline shells out to.
///
/// ```toml
/// [tools]
/// sass = { cmd = "sass", args = ["--no-source-map"] }
/// lint = { cmd = "jshint" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    #[serde(default = "default_sass_tool")]
    pub sass: ToolSpec,

    #[serde(default = "default_autoprefixer_tool")]
    pub autoprefixer: ToolSpec,

    #[serde(default = "default_cssmin_tool")]
    pub cssmin: ToolSpec,

    #[serde(default = "default_jsmin_tool")]
    pub jsmin: ToolSpec,

    #[serde(default = "default_lint_tool")]
    pub lint: ToolSpec,

    #[serde(default = "default_styleguide_tool")]
    pub styleguide: ToolSpec,

    #[serde(default = "default_git_tool")]
    pub git: ToolSpec,
}

fn default_sass_tool() -> ToolSpec {
    ToolSpec::new("sass", &["--no-source-map"])
}

fn default_autoprefixer_tool() -> ToolSpec {
    ToolSpec::new("postcss", &["--use", "autoprefixer"])
}

fn default_cssmin_tool() -> ToolSpec {
    ToolSpec::new("cleancss", &[])
}

fn default_jsmin_tool() -> ToolSpec {
    ToolSpec::new("uglifyjs", &["--compress", "--mangle"])
}

fn default_lint_tool() -> ToolSpec {
    ToolSpec::new("jshint", &[])
}

fn default_styleguide_tool() -> ToolSpec {
    ToolSpec::new("hologram", &[])
}

fn default_git_tool() -> ToolSpec {
    ToolSpec::new("git", &[])
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            sass: default_sass_tool(),
            autoprefixer: default_autoprefixer_tool(),
            cssmin: default_cssmin_tool(),
            jsmin: default_jsmin_tool(),
            lint: default_lint_tool(),
            styleguide: default_styleguide_tool(),
            git: default_git_tool(),
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// `[deploy]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploySection {
    /// Remote whose URL the publish is force-pushed to.
    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default = "default_commit_message")]
    pub message: String,
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_branch() -> String {
    "gh-pages".to_string()
}

fn default_commit_message() -> String {
    "Publish style guide".to_string()
}

impl Default for DeploySection {
    fn default() -> Self {
        Self {
            remote: default_remote(),
            branch: default_branch(),
            message: default_commit_message(),
        }
    }
}

/// `[watch]` section.
///
/// ```toml
/// [watch]
/// use_hash = true
/// exclude = [".git/**", ".musashi/**"]
///
/// [[watch.bindings]]
/// patterns = ["**/*.html"]
/// action = "reload"
///
/// [[watch.bindings]]
/// patterns = ["assets/sass/**/*.scss"]
/// tasks = ["styles", "styleguide"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Skip a binding's tasks when the aggregated content hash of its
    /// matching files is unchanged since the last run.
    #[serde(default)]
    pub use_hash: bool,

    /// Exclude patterns applied to every binding.
    #[serde(default = "default_watch_exclude")]
    pub exclude: Vec<String>,

    #[serde(default = "default_watch_bindings")]
    pub bindings: Vec<WatchBindingConfig>,
}

fn default_watch_exclude() -> Vec<String> {
    vec![".git/**".to_string(), format!("{INTERNAL_DIR}/**")]
}

fn default_watch_bindings() -> Vec<WatchBindingConfig> {
    vec![
        WatchBindingConfig {
            patterns: vec!["**/*.html".to_string()],
            exclude: Vec::new(),
            tasks: Vec::new(),
            action: Some("reload".to_string()),
        },
        WatchBindingConfig {
            patterns: vec!["assets/sass/**/*.scss".to_string()],
            exclude: Vec::new(),
            tasks: vec!["styles".to_string(), "styleguide".to_string()],
            action: None,
        },
    ]
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            use_hash: false,
            exclude: default_watch_exclude(),
            bindings: default_watch_bindings(),
        }
    }
}

/// One `[[watch.bindings]]` entry.
///
/// A binding either names `tasks` to run (followed by a reload broadcast on
/// success) or is a plain reload binding (`action = "reload"`, which is also
/// the implied default when `tasks` is empty).
#[derive(Debug, Clone, Deserialize)]
pub struct WatchBindingConfig {
    pub patterns: Vec<String>,

    /// Binding-local excludes, merged with `[watch].exclude`.
    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub tasks: Vec<String>,

    #[serde(default)]
    pub action: Option<String>,
}
