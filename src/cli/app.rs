//! CLI module for the tagnotes application
//!
//! Maps each command onto note store and tag store operations and renders
//! the results.
use std::{
    fs::{read_to_string, OpenOptions},
    io::{stdin, stdout, Write},
    path::{Path, PathBuf},
    process::Command,
    sync::Arc,
};

use chrono::Local;
use console::style;
use log::{debug, info};
use serde_json::json;
use shell_words::split;
use tempfile::Builder;

use crate::{
    group_by_day, parse_timestamp, strip_editor_comments, truncate_for_display, validate_content,
    BuiltinTag, Commands, Config, CustomTag, Feedback, Note, NoteQuery, NoteStore, NoteUpdate,
    NotesError, Result, Rgb, TagCommands, TagFilter, TagRef, TagSelection, TagStore,
};

const DEFAULT_WIDTH: usize = 80;

/// CLI Application handler - processes CLI commands against the stores
pub struct App {
    notes: Arc<NoteStore>,
    tags: Arc<TagStore>,

    /// Application configuration
    config: Config,

    /// Where `config --set/--reset` writes to
    config_path: PathBuf,

    feedback: Arc<dyn Feedback>,

    /// Whether to display verbose output
    verbose: bool,
}

impl App {
    pub fn new(
        notes: Arc<NoteStore>,
        tags: Arc<TagStore>,
        config: Config,
        config_path: PathBuf,
        feedback: Arc<dyn Feedback>,
        verbose: bool,
    ) -> Self {
        Self {
            notes,
            tags,
            config,
            config_path,
            feedback,
            verbose,
        }
    }

    /// Run the CLI application with the given command
    pub async fn run(&mut self, command: Commands) -> Result<()> {
        let outcome = match command {
            Commands::Add {
                content,
                tag,
                custom_tag,
                at,
                edit,
            } => self.add_note(content, tag, custom_tag, at, edit),

            Commands::List {
                selection,
                search,
                limit,
                json,
                timeline,
            } => self.list_notes(selection, search, limit, json, timeline),

            Commands::Edit {
                id,
                content,
                tag,
                custom_tag,
                no_custom_tag,
                at,
                edit,
            } => self.edit_note(id, content, tag, custom_tag, no_custom_tag, at, edit),

            Commands::Delete { id } => self.delete_note(&id),

            Commands::Clear { force } => self.clear_notes(force),

            Commands::Tag(command) => self.run_tag_command(command),

            Commands::Config { show, set, reset } => self.handle_config(show, set, reset),
        };

        if outcome.is_err() {
            self.feedback.error();
        }
        outcome
    }

    fn add_note(
        &self,
        content: Option<String>,
        tag: Option<BuiltinTag>,
        custom_tag: Option<String>,
        at: Option<String>,
        edit: bool,
    ) -> Result<()> {
        let content = match content {
            Some(content) if !edit => content,
            initial => self.open_editor_for_content(initial.as_deref().unwrap_or(""))?,
        };

        let custom_tag = custom_tag
            .map(|name_or_id| self.tags.resolve(&name_or_id))
            .transpose()?;
        let created_at = at
            .map(|at| parse_timestamp(&at))
            .transpose()?
            .unwrap_or_else(chrono::Utc::now);
        let tag = tag.unwrap_or(self.config.default_tag);

        let note = Note::with_timestamp(&content, tag, custom_tag, created_at)?;
        let id = note.id;
        self.notes.add(note);

        println!("Note created with ID: {}", id);
        Ok(())
    }

    fn resolve_filter(&self, selection: TagSelection) -> Result<TagFilter> {
        let filter = match (selection.tag, selection.custom_tag) {
            (Some(tag), _) => TagFilter::Builtin(tag),
            (None, Some(name_or_id)) => TagFilter::Custom(self.tags.resolve(&name_or_id)?.id),
            (None, None) => TagFilter::All,
        };

        if filter != TagFilter::All {
            self.feedback.selection();
        }
        Ok(filter)
    }

    /// List notes according to the tag selection and search text
    fn list_notes(
        &self,
        selection: TagSelection,
        search: Option<String>,
        limit: Option<usize>,
        json: bool,
        timeline: bool,
    ) -> Result<()> {
        let query = NoteQuery::new(self.resolve_filter(selection)?, search.unwrap_or_default());
        let mut notes = self.notes.search(&query);
        let total = notes.len();

        if total == 0 && !json {
            println!("No notes found.");
            return Ok(());
        }

        notes.truncate(limit.unwrap_or(self.config.list_limit));
        debug!("Showing {} of {} matching notes", notes.len(), total);

        if json {
            println!("{}", serde_json::to_string_pretty(&notes)?);
            return Ok(());
        }

        if timeline {
            for group in group_by_day(&notes, &Local) {
                println!("{}", style(group.date.format("%Y-%m-%d %a")).bold());
                for note in &group.notes {
                    println!("  {}", self.note_line(note, "%H:%M", 2));
                }
            }
        } else {
            for note in &notes {
                println!("{}", self.note_line(note, "%Y-%m-%d %H:%M", 0));
            }
        }

        if total > notes.len() {
            println!("{}", style(format!("... {} more", total - notes.len())).dim());
        }
        Ok(())
    }

    fn note_line(&self, note: &Note, time_format: &str, indent: usize) -> String {
        let short_id: String = note.id.to_string().chars().take(8).collect();
        let time = note.created_at.with_timezone(&Local).format(time_format).to_string();
        let tag = format!("[{}]", note.display_tag_name());

        // id, time, tag and the separating spaces
        let used = indent + short_id.len() + time.len() + tag.chars().count() + 3;
        let width = terminal_width().saturating_sub(used).max(10);
        let content = if self.verbose {
            note.content.clone()
        } else {
            truncate_for_display(&note.content, width)
        };

        format!(
            "{} {} {} {}",
            style(short_id).dim(),
            time,
            style(tag).color256(ansi256(note.display_color())),
            content
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn edit_note(
        &self,
        id: String,
        content: Option<String>,
        tag: Option<BuiltinTag>,
        custom_tag: Option<String>,
        no_custom_tag: bool,
        at: Option<String>,
        edit: bool,
    ) -> Result<()> {
        let note = self.notes.find_by_prefix(&id)?;
        let mut update = NoteUpdate::default();

        let content = if edit {
            Some(self.open_editor_for_content(content.as_deref().unwrap_or(&note.content))?)
        } else {
            content
        };
        if let Some(content) = content {
            update = update.content(validate_content(&content)?);
        }
        if let Some(tag) = tag {
            update = update.tag(tag);
        }
        if no_custom_tag {
            update = update.custom_tag(None);
        } else if let Some(name_or_id) = custom_tag {
            update = update.custom_tag(Some(self.tags.resolve(&name_or_id)?));
        }
        if let Some(at) = at {
            update = update.created_at(parse_timestamp(&at)?);
        }

        if update.is_empty() {
            return Err(NotesError::InvalidInput {
                message: "nothing to change; pass --content, --tag, --custom-tag, --no-custom-tag, --at or --edit".to_string(),
            });
        }

        if !self.notes.update(note.id, update) {
            return Err(NotesError::NoteNotFound {
                id: note.id.to_string(),
            });
        }
        println!("Note {} updated", note.id);
        Ok(())
    }

    fn delete_note(&self, id: &str) -> Result<()> {
        let note = self.notes.find_by_prefix(id)?;
        self.notes.delete(note.id);
        println!("Deleted note {}: {}", note.id, truncate_for_display(&note.content, 40));
        Ok(())
    }

    fn clear_notes(&self, force: bool) -> Result<()> {
        let count = self.notes.len();
        if count == 0 {
            println!("No notes to delete.");
            return Ok(());
        }

        if !force && !confirm(&format!("Delete all {} notes? This action cannot be undone! [y/N]: ", count))? {
            println!("Clear cancelled.");
            return Ok(());
        }

        self.notes.clear();
        println!("Deleted {} notes.", count);
        Ok(())
    }

    fn run_tag_command(&self, command: TagCommands) -> Result<()> {
        match command {
            TagCommands::Add { name, icon, color } => {
                let tag = CustomTag::new(&name, icon.as_deref(), color.as_deref())?;
                let id = tag.id;
                self.tags.add(tag)?;
                println!("Tag created with ID: {}", id);
            }

            TagCommands::List { search, json } => self.list_tags(search.as_deref().unwrap_or(""), json)?,

            TagCommands::Update {
                id,
                name,
                icon,
                color,
            } => {
                let current = self.tags.resolve(&id)?;
                let replacement = current.edited(name.as_deref(), icon.as_deref(), color.as_deref())?;

                if !self.tags.update(replacement)? {
                    return Err(NotesError::TagNotFound {
                        id: current.id.to_string(),
                    });
                }
                println!("Tag {} updated", current.id);
            }

            TagCommands::Delete { id } => {
                let tag = self.tags.resolve(&id)?;
                self.tags.delete(tag.id);
                let still_tagged = self.notes.count(&TagFilter::Custom(tag.id));
                println!("Deleted tag '{}'", tag.name);
                if still_tagged > 0 {
                    println!("{} notes keep their copy of this tag.", still_tagged);
                }
            }
        }
        Ok(())
    }

    fn list_tags(&self, search: &str, json: bool) -> Result<()> {
        let entries: Vec<(TagRef, usize)> = self
            .tags
            .search(search)
            .into_iter()
            .map(|tag| {
                let filter = match &tag {
                    TagRef::Builtin(builtin) => TagFilter::Builtin(*builtin),
                    TagRef::Custom(custom) => TagFilter::Custom(custom.id),
                };
                let count = self.notes.count(&filter);
                (tag, count)
            })
            .collect();

        if json {
            let values: Vec<_> = entries
                .iter()
                .map(|(tag, count)| {
                    json!({
                        "id": tag.id(),
                        "name": tag.display_name(),
                        "icon": tag.icon(),
                        "color": tag.color().to_hex(),
                        "builtin": tag.is_builtin(),
                        "notes": count,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&values)?);
            return Ok(());
        }

        if entries.is_empty() {
            println!("No tags found.");
            return Ok(());
        }

        for (tag, count) in &entries {
            let kind = if tag.is_builtin() { "built-in" } else { "custom" };
            println!(
                "{:<38} {} {:<10} {:>4} notes",
                style(tag.id()).dim(),
                style(format!("{:<16}", tag.display_name())).color256(ansi256(tag.color())),
                kind,
                count
            );
        }
        Ok(())
    }

    fn handle_config(&mut self, show: bool, set: Option<String>, reset: bool) -> Result<()> {
        if reset {
            self.config = Config::default();
            self.config.save(&self.config_path)?;
            println!("Configuration reset to defaults.");
        }

        if let Some(assignment) = set {
            let (key, value) = assignment.split_once('=').ok_or_else(|| NotesError::ConfigError {
                message: format!("expected key=value, got '{}'", assignment),
            })?;
            self.config.set(key, value)?;
            self.config.save(&self.config_path)?;
            info!("Configuration updated: {}", key.trim());
            println!("Set {} = {}", key.trim(), value.trim());
        }

        if show || !reset {
            println!("{}", serde_json::to_string_pretty(&self.config)?);
            println!("{}", style(format!("(from {})", self.config_path.display())).dim());
        }
        Ok(())
    }

    fn open_editor_for_content(&self, initial: &str) -> Result<String> {
        let temp_file = Builder::new().prefix("tagnotes-").suffix(".md").tempfile()?;
        let temp_path = temp_file.path().to_path_buf();

        self.write_editor_template(&temp_path, initial)?;

        let editor_cmd = self.config.get_editor_command();
        info!("Opening editor to write note content. Save and exit when done...");
        self.launch_editor(&editor_cmd, &temp_path)?;

        let content = read_to_string(&temp_path)?;
        Ok(strip_editor_comments(&content))
    }

    fn write_editor_template(&self, path: &Path, initial: &str) -> Result<()> {
        let mut file = OpenOptions::new().write(true).truncate(true).open(path)?;

        writeln!(file, "<!-- Write your note below. Comment lines like this one are ignored. -->")?;
        writeln!(file, "<!-- Save and exit the editor when you're done; an empty note is discarded. -->")?;
        writeln!(file)?;
        if !initial.is_empty() {
            writeln!(file, "{}", initial)?;
        }

        Ok(())
    }

    fn launch_editor(&self, editor_cmd: &str, file_path: &Path) -> Result<()> {
        let args = split(editor_cmd).map_err(|e| NotesError::EditorError {
            message: format!("Failed to parse editor command: {}", e),
        })?;

        let (program, rest) = args.split_first().ok_or_else(|| NotesError::EditorError {
            message: "Empty editor command".to_string(),
        })?;

        let status = Command::new(program)
            .args(rest)
            .arg(file_path)
            .status()
            .map_err(|e| NotesError::EditorError {
                message: format!("Failed to launch editor '{}': {}", program, e),
            })?;

        if !status.success() {
            return Err(NotesError::EditorError {
                message: "Editor exited with non-zero status".to_string(),
            });
        }

        Ok(())
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    stdout().flush().map_err(NotesError::Io)?;

    let mut input = String::new();
    stdin().read_line(&mut input).map_err(NotesError::Io)?;
    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(terminal_size::Width(w), _)| w as usize)
        .unwrap_or(DEFAULT_WIDTH)
}

/// Nearest color in the xterm 6x6x6 cube.
fn ansi256(rgb: Rgb) -> u8 {
    let level = |c: u8| (c as u16 * 5 + 127) / 255;
    (16 + 36 * level(rgb.r) + 6 * level(rgb.g) + level(rgb.b)) as u8
}
