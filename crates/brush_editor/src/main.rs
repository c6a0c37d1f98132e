//! Brushwork command-line shell
//!
//! Opens a map, runs editor commands against it and optionally saves or
//! autosaves the result:
//!
//! ```text
//! brushwork <map.json> [command-id ...] [--save] [--autosave]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use brush_editor::commands::default_registry;
use brush_editor::core::autosave;
use brush_editor::operations::error_chain;
use brush_editor::{EditorPreferences, EditorResult, EditorSession, JsonMapProvider, TomlGameDataProvider, NAME, VERSION};
use brush_editor::brush_map::ObjectKind;

struct Args {
    map: PathBuf,
    commands: Vec<String>,
    save: bool,
    autosave: bool,
}

fn parse_args() -> Option<Args> {
    let mut map = None;
    let mut commands = Vec::new();
    let mut save = false;
    let mut autosave = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--save" => save = true,
            "--autosave" => autosave = true,
            _ if map.is_none() => map = Some(PathBuf::from(arg)),
            _ => commands.push(arg),
        }
    }
    Some(Args {
        map: map?,
        commands,
        save,
        autosave,
    })
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(args) = parse_args() else {
        eprintln!("{NAME} {VERSION}");
        eprintln!("usage: brushwork <map.json> [command-id ...] [--save] [--autosave]");
        return ExitCode::from(2);
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", error_chain(&e));
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> EditorResult<()> {
    let preferences = EditorPreferences::default_path()
        .map(|path| EditorPreferences::load_or_default(&path))
        .unwrap_or_default();
    let map_provider = JsonMapProvider::new();
    let registry = default_registry();

    let mut session = EditorSession::new(preferences);
    let id = session.open_document(&args.map, &map_provider, &TomlGameDataProvider, chrono::Utc::now())?;
    let autosave_settings = session.preferences().autosave.clone();
    let document = session
        .document_mut(id)
        .ok_or(brush_editor::EditorError::DocumentNotFound(id))?;

    let map = document.map();
    let count = |kind: ObjectKind| map.find_all().filter(|o| o.kind() == kind).count();
    log::info!(
        "{}: {} groups, {} solids, {} entities, {} selected",
        document.name(),
        count(ObjectKind::Group),
        count(ObjectKind::Solid),
        count(ObjectKind::Entity),
        document.selection().count()
    );

    for command in &args.commands {
        registry.invoke(command, document)?;
    }

    if args.save {
        document.save(&map_provider)?;
    }
    if args.autosave {
        let outcome = autosave::run(document, &map_provider, &autosave_settings, chrono::Utc::now())?;
        log::info!("{:?}", outcome);
    }
    Ok(())
}
