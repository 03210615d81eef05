/// Content Linter — validates dialogue content and scene files.
///
/// Usage: content_linter <content_dir> [--scene <scene.ron>]...

use dialogue_engine::core::config::SceneConfig;
use dialogue_engine::core::store::ContentLibrary;
use dialogue_engine::schema::content::{ContentId, DialogueContent};
use dialogue_engine::schema::mode::ModeConfig;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: content_linter <content_dir> [--scene <scene.ron>]...");
        process::exit(0);
    }

    let content_dir = &args[1];
    let mut scene_paths = Vec::new();

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--scene" && i + 1 < args.len() {
            i += 1;
            scene_paths.push(PathBuf::from(&args[i]));
        } else {
            eprintln!("Unknown argument: {}", args[i]);
            process::exit(1);
        }
        i += 1;
    }

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let path = Path::new(content_dir);
    let files = if path.is_file() {
        vec![path.to_path_buf()]
    } else if path.is_dir() {
        collect_ron_files(path)
    } else {
        eprintln!("ERROR: Path '{}' does not exist", content_dir);
        process::exit(1);
    };

    // Parse file by file so duplicates across files are reported rather
    // than silently replaced.
    let mut contents: FxHashMap<ContentId, DialogueContent> = FxHashMap::default();
    for file in &files {
        let input = match std::fs::read_to_string(file) {
            Ok(s) => s,
            Err(e) => {
                errors.push(format!("{}: {}", file.display(), e));
                continue;
            }
        };
        match ContentLibrary::parse_ron(&input) {
            Ok(parsed) => {
                println!("  Loaded: {} ({} contents)", file.display(), parsed.len());
                for content in parsed {
                    if contents.contains_key(&content.id) {
                        errors.push(format!(
                            "Content '{}' in {} is already defined in another file",
                            content.id,
                            file.display()
                        ));
                    }
                    contents.insert(content.id.clone(), content);
                }
            }
            Err(e) => errors.push(format!("{}: {}", file.display(), e)),
        }
    }

    println!("Loaded {} dialogue contents", contents.len());

    lint_contents(&contents, &mut errors, &mut warnings);

    for scene_path in &scene_paths {
        match SceneConfig::load_from_ron(scene_path) {
            Ok(scene) => {
                let label = scene_path.display().to_string();
                lint_scene(&label, &scene, &contents, &mut errors, &mut warnings);
            }
            Err(e) => errors.push(format!("{}: {}", scene_path.display(), e)),
        }
    }

    println!("\n=== Content Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if !errors.is_empty() {
        process::exit(1);
    }
}

fn collect_ron_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_ron_files(&path));
            } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                // Scene files live next to content but have their own shape.
                let is_scene = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(|s| s.ends_with("_scene") || s == "scene")
                    .unwrap_or(false);
                if !is_scene {
                    files.push(path);
                }
            }
        }
    }
    files.sort();
    files
}

fn lint_contents(
    contents: &FxHashMap<ContentId, DialogueContent>,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    let mut ids: Vec<&ContentId> = contents.keys().collect();
    ids.sort();
    for id in ids {
        let content = &contents[id];
        if id.as_str().is_empty() {
            errors.push("Content with an empty id".to_string());
        }
        if content.is_empty() {
            warnings.push(format!(
                "Content '{}' has no lines; it will start and end immediately",
                id
            ));
        }
        for line in &content.lines {
            if line.text.trim().is_empty() {
                warnings.push(format!("Content '{}' line {} is blank", id, line.index));
            }
        }
    }
}

fn lint_scene(
    label: &str,
    scene: &SceneConfig,
    contents: &FxHashMap<ContentId, DialogueContent>,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    let start = contents.get(&scene.start);
    if start.is_none() {
        errors.push(format!(
            "Scene '{}' starts at unknown content '{}'",
            label, scene.start
        ));
    }
    if scene.session.typing_speed < 0.0 || scene.session.next_line_delay < 0.0 {
        warnings.push(format!(
            "Scene '{}' has negative timings; they are treated as zero",
            label
        ));
    }

    match &scene.mode {
        ModeConfig::Linear => {}
        ModeConfig::Branching { options, .. } => {
            if options.is_empty() {
                warnings.push(format!("Scene '{}' is branching but has no options", label));
            }
            let mut keys = FxHashSet::default();
            for option in options {
                if option.key.is_empty() {
                    errors.push(format!(
                        "Scene '{}' option '{}' has an empty key",
                        label, option.text
                    ));
                } else if !keys.insert(option.key.as_str()) {
                    warnings.push(format!(
                        "Scene '{}' repeats option key '{}'; the later option wins",
                        label, option.key
                    ));
                }
                match &option.target {
                    Some(target) if !contents.contains_key(target) => errors.push(format!(
                        "Scene '{}' option '{}' targets unknown content '{}'",
                        label, option.key, target
                    )),
                    Some(_) => {}
                    None => warnings.push(format!(
                        "Scene '{}' option '{}' has no target and will never be offered",
                        label, option.key
                    )),
                }
            }
        }
        ModeConfig::Voice { clips } => {
            let mut indices = FxHashSet::default();
            for clip in clips {
                if !indices.insert(clip.line_index) {
                    warnings.push(format!(
                        "Scene '{}' maps line {} twice; the later clip wins",
                        label, clip.line_index
                    ));
                }
                if let Some(start) = start {
                    if clip.line_index >= start.len() {
                        warnings.push(format!(
                            "Scene '{}' clip '{}' is for line {} but '{}' has {} lines",
                            label,
                            clip.clip,
                            clip.line_index,
                            start.id,
                            start.len()
                        ));
                    }
                }
            }
            if let Some(start) = start {
                for line in &start.lines {
                    if !clips.iter().any(|c| c.line_index == line.index) && line.audio.is_none() {
                        warnings.push(format!(
                            "Scene '{}' line {} of '{}' has no voice clip",
                            label, line.index, start.id
                        ));
                    }
                }
            }
        }
    }
}
