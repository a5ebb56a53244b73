//! Handlers of the `/itemsmelter` command and of its completion.

use tracing::warn;

use crate::engine::Smelter;
use crate::host::{Platform, Sender, PERMISSION_ADMIN};
use crate::locale::FALLBACK_LOCALE;


/// Describe all the context when a command is executed by something.
pub struct CommandContext<'a> {
    /// The command parts, after the command name.
    pub parts: &'a [&'a str],
    pub sender: Sender,
    pub smelter: &'a mut Smelter,
    pub host: &'a mut dyn Platform,
}

impl CommandContext<'_> {

    /// Send a message to the sender, localized for actors and in plain english for
    /// the console.
    fn send(&mut self, key: &str, params: &[(&str, &str)]) {
        let text = match self.sender {
            Sender::Console => self.smelter.locales().message(Some(FALLBACK_LOCALE), key, params),
            Sender::Actor(actor) => self.smelter.message(Some(actor), key, params),
        };
        self.host.send_message(self.sender, &text);
    }

    fn has_permission(&self, permission: &str) -> bool {
        match self.sender {
            Sender::Console => true,
            Sender::Actor(actor) => self.host.has_permission(actor, permission),
        }
    }

}

/// Handle a command and execute it.
pub fn handle_command(mut ctx: CommandContext) {

    // No subcommand shows the help.
    let cmd_name = ctx.parts.first().copied().unwrap_or("help");

    let Some(cmd) = find_command(cmd_name) else {
        ctx.send("unknown_command", &[]);
        return;
    };

    if let Some(permission) = cmd.permission {
        if !ctx.has_permission(permission) {
            ctx.send("no_permission", &[]);
            return;
        }
    }

    if cmd.actor_only && ctx.sender.actor().is_none() {
        ctx.send("players_only", &[]);
        return;
    }

    let res = (cmd.handler)(CommandContext {
        parts: ctx.parts.get(1..).unwrap_or_default(),
        sender: ctx.sender,
        smelter: &mut *ctx.smelter,
        host: &mut *ctx.host,
    });

    if res.is_err() {
        if let Some(usage) = cmd.usage {
            ctx.send(usage, &[]);
        }
    }

}

/// Complete the last part of a command.
pub fn complete(smelter: &Smelter, parts: &[&str]) -> Vec<String> {

    let candidates: Vec<&str> = match parts {
        [_] => COMMANDS.iter().map(|cmd| cmd.name).collect(),
        [cmd_name, _] => match find_command(cmd_name).map(|cmd| cmd.name) {
            Some("sound") => vec!["on", "off"],
            Some("lang") => smelter.locales().available_codes(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    let Some(input) = parts.last() else {
        return Vec::new();
    };

    let input = input.to_ascii_lowercase();
    candidates.into_iter()
        .filter(|candidate| candidate.to_ascii_lowercase().starts_with(&input))
        .map(str::to_string)
        .collect()

}

/// The result of a command, an error prints the command usage.
type CommandResult = Result<(), ()>;

/// Describe a command.
struct Command {
    /// The command name.
    name: &'static str,
    /// Other names of the command.
    aliases: &'static [&'static str],
    /// Message key of the command line in help.
    help: &'static str,
    /// Message key of the usage, printed when the command fails.
    usage: Option<&'static str>,
    /// Permission needed by actors to run the command.
    permission: Option<&'static str>,
    /// The command can only be run by actors.
    actor_only: bool,
    /// The command handler to call when executing it.
    handler: fn(CommandContext) -> CommandResult,
}

/// Internal array of commands.
const COMMANDS: &[Command] = &[
    Command {
        name: "reload",
        aliases: &[],
        help: "help_reload",
        usage: None,
        permission: Some(PERMISSION_ADMIN),
        actor_only: false,
        handler: cmd_reload,
    },
    Command {
        name: "sound",
        aliases: &["sounds"],
        help: "help_sound",
        usage: Some("sound_usage"),
        permission: None,
        actor_only: true,
        handler: cmd_sound,
    },
    Command {
        name: "lang",
        aliases: &["language"],
        help: "help_lang",
        usage: Some("lang_usage"),
        permission: None,
        actor_only: true,
        handler: cmd_lang,
    },
    Command {
        name: "recipes",
        aliases: &[],
        help: "help_recipes",
        usage: None,
        permission: Some(PERMISSION_ADMIN),
        actor_only: false,
        handler: cmd_recipes,
    },
    Command {
        name: "help",
        aliases: &[],
        help: "help_help",
        usage: None,
        permission: None,
        actor_only: false,
        handler: cmd_help,
    },
    Command {
        name: "info",
        aliases: &[],
        help: "help_info",
        usage: None,
        permission: None,
        actor_only: false,
        handler: cmd_info,
    },
];

fn find_command(name: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|cmd| {
        cmd.name.eq_ignore_ascii_case(name)
            || cmd.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(name))
    })
}

fn cmd_help(mut ctx: CommandContext) -> CommandResult {

    ctx.send("help_header", &[]);

    let console = ctx.sender.actor().is_none();
    for cmd in COMMANDS {
        if !(console && cmd.actor_only) {
            ctx.send(cmd.help, &[]);
        }
    }

    Ok(())

}

fn cmd_reload(mut ctx: CommandContext) -> CommandResult {

    match ctx.smelter.reload(ctx.host.as_recipe_book()) {
        Ok(()) => {
            ctx.send("reload_success", &[]);
            if ctx.sender.actor().is_some() {
                let items = ctx.smelter.registry().len().to_string();
                ctx.send("info_items", &[("items", items.as_str())]);
            }
        }
        Err(err) => {
            warn!("reload failed: {err}");
            ctx.send("reload_error", &[]);
        }
    }

    Ok(())

}

fn cmd_sound(mut ctx: CommandContext) -> CommandResult {

    let Some(actor) = ctx.sender.actor() else {
        return Err(());
    };

    let parts = ctx.parts;
    match parts {
        [] => {
            if ctx.smelter.settings().is_sound_enabled(actor) {
                ctx.send("sound_status_on", &[]);
            } else {
                ctx.send("sound_status_off", &[]);
            }
        }
        [value] => {
            let enabled = match value.to_ascii_lowercase().as_str() {
                "on" | "enable" | "true" => true,
                "off" | "disable" | "false" => false,
                _ => return Err(()),
            };
            ctx.smelter.settings_mut().set_sound_enabled(actor, enabled);
            ctx.send(if enabled { "sound_enabled" } else { "sound_disabled" }, &[]);
        }
        _ => return Err(()),
    }

    Ok(())

}

fn cmd_lang(mut ctx: CommandContext) -> CommandResult {

    let Some(actor) = ctx.sender.actor() else {
        return Err(());
    };

    let codes = ctx.smelter.locales().available_codes().join(", ");

    let parts = ctx.parts;
    match parts {
        [] => ctx.send("lang_list", &[("languages", codes.as_str())]),
        [code] => {
            match ctx.smelter.locales().resolve_code(code).map(str::to_string) {
                Some(id) => {
                    let name = ctx.smelter.locales().name_of(code);
                    ctx.smelter.settings_mut().set_locale(actor, &id);
                    ctx.send("lang_changed", &[("language", name.as_str())]);
                }
                None => ctx.send("lang_invalid", &[("languages", codes.as_str())]),
            }
        }
        _ => return Err(()),
    }

    Ok(())

}

fn cmd_recipes(mut ctx: CommandContext) -> CommandResult {

    let registry = ctx.smelter.registry().clone();
    let ids = ctx.smelter.recipes().registered_items()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let count = ids.len().to_string();
    ctx.send("recipes_header", &[("count", count.as_str())]);

    for id in ids {
        let Some(def) = registry.iter().find(|def| def.id == id) else {
            continue;
        };
        let material = def.material.display_name();
        let output = def.output.display_name();
        ctx.send("recipes_item", &[
            ("id", def.id.as_str()),
            ("material", material.as_str()),
            ("output", output.as_str()),
            ("furnace", def.smelt_in.name()),
        ]);
    }

    Ok(())

}

fn cmd_info(mut ctx: CommandContext) -> CommandResult {

    let items = ctx.smelter.registry().len().to_string();
    let recipes = ctx.smelter.recipes().registered_count().to_string();
    let author = match env!("CARGO_PKG_AUTHORS") {
        "" => "unknown",
        authors => authors,
    };

    ctx.send("info_header", &[]);
    ctx.send("info_version", &[("version", env!("CARGO_PKG_VERSION"))]);
    ctx.send("info_items", &[("items", items.as_str())]);
    ctx.send("info_recipes", &[("recipes", recipes.as_str())]);
    ctx.send("info_author", &[("author", author)]);

    Ok(())

}
