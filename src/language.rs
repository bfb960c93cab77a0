use std::path::Path;

/// Fence info string for a file, by extension (or by well-known file name
/// for extensionless build files). Unknown files get `text`.
pub fn fence_language(path: &Path) -> &'static str {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();

    match file_name.as_ref() {
        "Dockerfile" => return "dockerfile",
        "Makefile" | "makefile" | "GNUmakefile" => return "makefile",
        "CMakeLists.txt" => return "cmake",
        _ => {}
    }

    let Some(extension) = path.extension() else {
        return "text";
    };
    language_for_extension(&extension.to_string_lossy().to_ascii_lowercase())
}

fn language_for_extension(extension: &str) -> &'static str {
    match extension {
        "py" | "pyw" | "pyi" => "python",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "jsx",
        "ts" => "typescript",
        "tsx" => "tsx",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "scala" => "scala",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => "cpp",
        "cs" => "csharp",
        "go" => "go",
        "rs" => "rust",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "m" => "objective-c",
        "r" => "r",
        "jl" => "julia",
        "lua" => "lua",
        "pl" | "pm" => "perl",
        "dart" => "dart",
        "ex" | "exs" => "elixir",
        "erl" | "hrl" => "erlang",
        "clj" | "cljs" => "clojure",
        "hs" => "haskell",
        "ml" => "ocaml",

        "html" | "htm" => "html",
        "xml" | "svg" => "xml",
        "css" => "css",
        "scss" => "scss",
        "sass" => "sass",
        "less" => "less",
        "vue" => "vue",
        "svelte" => "svelte",

        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "ini" | "cfg" | "conf" | "editorconfig" => "ini",
        "csv" | "tsv" => "csv",

        "md" | "markdown" => "markdown",
        "rst" => "rst",
        "adoc" => "asciidoc",

        "sh" | "bash" | "env" => "bash",
        "zsh" => "zsh",
        "fish" => "fish",
        "ps1" | "psm1" => "powershell",
        "bat" | "cmd" => "batch",

        "sql" | "psql" | "mysql" | "pgsql" => "sql",

        "dockerfile" => "dockerfile",
        "properties" => "properties",
        "gradle" => "gradle",
        "makefile" => "makefile",
        "cmake" => "cmake",
        "proto" => "protobuf",
        "graphql" | "gql" => "graphql",

        _ => "text",
    }
}
