//! Static-asset packager plugin: walks the files and directories named on
//! the command line, honoring include/ignore regexes, producing one output
//! file and folding the directories it walked into `extra` so the
//! fingerprint notices files added or removed from them.

use std::path::Path;

use regex::Regex;
use walkdir::WalkDir;

use crate::options::GenerateOptions;
use crate::plugin::{InputOutputFiles, Plugin};

use super::parse_args;

pub struct StaticAssetsPlugin;

impl Plugin for StaticAssetsPlugin {
    fn name(&self) -> &'static str {
        "static_assets"
    }

    fn matches(&self, opts: &GenerateOptions) -> bool {
        opts.executable_name == "esc"
    }

    fn infer(&self, opts: &GenerateOptions) -> Option<InputOutputFiles> {
        let parsed = parse_args(&opts.sanitized_args, &["o", "output", "ignore", "include"]);

        let ignore = parsed
            .get("ignore")
            .map(Regex::new)
            .transpose()
            .ok()
            .flatten();
        let include = parsed
            .get("include")
            .map(Regex::new)
            .transpose()
            .ok()
            .flatten();

        let mut files = Vec::new();
        let mut directories = Vec::new();

        for base in &parsed.positionals {
            let base_path = opts.dir().join(base);
            if ignore.as_ref().is_some_and(|re| re.is_match(base)) {
                continue;
            }
            if base_path.is_dir() {
                directories.push(to_slash(&base_path));
                collect_dir(&base_path, ignore.as_ref(), include.as_ref(), &mut files, &mut directories);
            } else if base_path.is_file()
                && include.as_ref().is_none_or(|re| re.is_match(base))
            {
                files.push(to_slash(&base_path));
            }
        }

        let output_file = parsed
            .get("o")
            .or_else(|| parsed.get("output"))
            .unwrap_or("static.go")
            .to_string();

        Some(InputOutputFiles {
            input_files: files,
            output_files: vec![output_file],
            output_patterns: vec![],
            extra: directories,
        })
    }
}

fn collect_dir(
    dir: &Path,
    ignore: Option<&Regex>,
    include: Option<&Regex>,
    files: &mut Vec<String>,
    directories: &mut Vec<String>,
) {
    for entry in WalkDir::new(dir).min_depth(1).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        let display = to_slash(path);
        if ignore.is_some_and(|re| re.is_match(&display)) {
            continue;
        }
        if entry.file_type().is_dir() {
            directories.push(display);
        } else if include.is_none_or(|re| re.is_match(&display)) {
            files.push(display);
        }
    }
}

fn to_slash(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}
