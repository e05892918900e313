use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;
use talk_contract::persist::write_atomic;
use talk_contract::{
    load_snapshot, save_snapshot, Action, ActionReceipt, BoardConfig, LikeArgs as LikeAction,
    Message, Partition, PartitionSnapshot, PostArgs as PostAction, ReplayEngine, SignedAction,
    Vote,
};
use talk_crypto::SigningKey;
use talk_types::{AccountName, MessageId};
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let ctx = Workspace::new(cli.config, cli.format);
    match cli.command {
        Command::Init(args) => cmd_init(&ctx, args),
        Command::Keygen(args) => cmd_keygen(&ctx, args),
        Command::Post(args) => cmd_post(&ctx, args),
        Command::Like(args) => cmd_like(&ctx, args),
        Command::Show(args) => cmd_show(&ctx, args),
        Command::Thread(args) => cmd_thread(&ctx, args),
        Command::Log(args) => cmd_log(&ctx, args),
        Command::Verify(_) => cmd_verify(&ctx),
    }
}

/// Where the board lives and how to print results.
struct Workspace {
    config_path: PathBuf,
    format: OutputFormat,
}

impl Workspace {
    fn new(config_path: PathBuf, format: OutputFormat) -> Self {
        Self {
            config_path,
            format,
        }
    }

    fn load_config(&self) -> anyhow::Result<BoardConfig> {
        debug!(config = %self.config_path.display(), "loading board config");
        BoardConfig::load(&self.config_path).with_context(|| {
            format!(
                "no board at {} (run `talk init` first)",
                self.config_path.display()
            )
        })
    }

    /// Paths in the config are relative to the config file's directory.
    fn resolve(&self, path: &Path) -> PathBuf {
        match self.config_path.parent() {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn state_path(&self, config: &BoardConfig) -> PathBuf {
        self.resolve(&config.state_path)
    }

    fn key_path(&self, config: &BoardConfig, account: &AccountName) -> PathBuf {
        self.resolve(&config.key_path(account))
    }

    fn open(&self) -> anyhow::Result<(BoardConfig, Partition)> {
        let config = self.load_config()?;
        let registry = config.registry()?;
        let partition = match load_snapshot(&self.state_path(&config))? {
            Some(snapshot) => Partition::from_snapshot(registry, snapshot)?,
            None => Partition::new(registry),
        };
        Ok((config, partition))
    }

    fn signing_key(
        &self,
        config: &BoardConfig,
        account: &AccountName,
    ) -> anyhow::Result<SigningKey> {
        let path = self.key_path(config, account);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("no key for {account} at {}", path.display()))?;
        SigningKey::from_hex(text.trim())
            .with_context(|| format!("bad key file {}", path.display()))
    }

    /// Sign as `account`, apply, and persist the new state.
    fn submit(&self, account: AccountName, action: Action) -> anyhow::Result<ActionReceipt> {
        let (config, partition) = self.open()?;
        let key = self.signing_key(&config, &account)?;
        let signed = SignedAction::sign(action, account, &key)?;
        let receipt = partition.apply(&signed)?;
        save_snapshot(&self.state_path(&config), &partition.snapshot()?)?;
        Ok(receipt)
    }

    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_init(ctx: &Workspace, args: InitArgs) -> anyhow::Result<()> {
    if ctx.config_path.exists() && !args.force {
        bail!(
            "{} already exists (use --force to overwrite)",
            ctx.config_path.display()
        );
    }
    let config = BoardConfig::default();
    config.save(&ctx.config_path)?;

    if ctx.json() {
        return print_json(&config);
    }
    println!(
        "{} Initialized board in {}",
        "✓".green().bold(),
        ctx.config_path.display().to_string().bold()
    );
    println!("  Contract: {}", config.contract.to_string().cyan());
    println!("  State: {}", ctx.state_path(&config).display());
    Ok(())
}

#[derive(Serialize)]
struct KeygenOutput {
    account: AccountName,
    public_key: String,
    key_file: PathBuf,
}

fn cmd_keygen(ctx: &Workspace, args: KeygenArgs) -> anyhow::Result<()> {
    let mut config = ctx.load_config()?;
    let path = ctx.key_path(&config, &args.account);
    if path.exists() && !args.force {
        bail!(
            "{} already exists (use --force to replace)",
            path.display()
        );
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;
    }

    let key = SigningKey::generate();
    write_atomic(&path, key.to_hex().as_bytes())?;
    config.register(args.account, &key.verifying_key());
    config.save(&ctx.config_path)?;

    let output = KeygenOutput {
        account: args.account,
        public_key: key.verifying_key().to_hex(),
        key_file: path,
    };
    if ctx.json() {
        return print_json(&output);
    }
    println!(
        "{} Registered {}",
        "✓".green().bold(),
        output.account.to_string().yellow().bold()
    );
    println!("  Public key: {}", output.public_key.cyan());
    println!("  Key file: {}", output.key_file.display());
    Ok(())
}

fn cmd_post(ctx: &Workspace, args: PostArgs) -> anyhow::Result<()> {
    let action = Action::Post(PostAction {
        id: args.id,
        reply_to: args.reply_to,
        author: args.author,
        content: args.content,
    });
    let receipt = ctx.submit(args.author, action)?;

    if ctx.json() {
        return print_json(&receipt);
    }
    println!(
        "{} Posted message {}",
        "✓".green().bold(),
        receipt.assigned_id.to_string().yellow().bold()
    );
    if args.reply_to != 0 {
        println!("  Reply to: {}", args.reply_to.to_string().yellow());
    }
    print_receipt_line(&receipt);
    Ok(())
}

fn cmd_like(ctx: &Workspace, args: LikeArgs) -> anyhow::Result<()> {
    let action = Action::Like(LikeAction {
        id: args.id,
        message: args.message,
        voter: args.voter,
        like: !args.dislike,
    });
    let receipt = ctx.submit(args.voter, action)?;

    if ctx.json() {
        return print_json(&receipt);
    }
    let verb = if args.dislike { "Disliked" } else { "Liked" };
    println!(
        "{} {} message {} (vote {})",
        "✓".green().bold(),
        verb,
        args.message.to_string().yellow().bold(),
        receipt.assigned_id
    );
    print_receipt_line(&receipt);
    Ok(())
}

fn print_receipt_line(receipt: &ActionReceipt) {
    println!(
        "  Receipt: {}",
        format!("r#{} {}", receipt.seq, receipt.short_hash()).yellow()
    );
}

#[derive(Serialize)]
struct ShowOutput {
    message: Message,
    votes: Vec<Vote>,
}

fn cmd_show(ctx: &Workspace, args: ShowArgs) -> anyhow::Result<()> {
    let (_, partition) = ctx.open()?;
    let Some(message) = partition.message(args.id)? else {
        bail!("message {} not found", args.id);
    };
    let votes = partition.votes_for(args.id)?;

    if ctx.json() {
        return print_json(&ShowOutput { message, votes });
    }
    print_message(&message, 0);
    for vote in &votes {
        let mark = if vote.value > 0 { "+1".green() } else { "-1".red() };
        println!("  {} {}", mark, vote.voter);
    }
    Ok(())
}

/// One message of a thread listing, at its reply depth.
#[derive(Serialize)]
struct ThreadEntry {
    depth: usize,
    message: Message,
}

/// Depth-first listing of the threads under `roots`, replies in id order.
///
/// Walks with an explicit stack; reply chains can be arbitrarily deep.
fn walk_threads<F>(roots: Vec<Message>, mut replies: F) -> anyhow::Result<Vec<ThreadEntry>>
where
    F: FnMut(MessageId) -> anyhow::Result<Vec<Message>>,
{
    let mut entries = Vec::new();
    let mut pending: Vec<ThreadEntry> = roots
        .into_iter()
        .rev()
        .map(|message| ThreadEntry { depth: 0, message })
        .collect();

    while let Some(entry) = pending.pop() {
        let depth = entry.depth + 1;
        let children = replies(entry.message.id)?;
        pending.extend(
            children
                .into_iter()
                .rev()
                .map(|message| ThreadEntry { depth, message }),
        );
        entries.push(entry);
    }
    Ok(entries)
}

fn cmd_thread(ctx: &Workspace, args: ThreadArgs) -> anyhow::Result<()> {
    let (_, partition) = ctx.open()?;
    let roots = if args.id == 0 {
        partition.replies(0)?
    } else {
        match partition.message(args.id)? {
            Some(message) => vec![message],
            None => bail!("message {} not found", args.id),
        }
    };
    let entries = walk_threads(roots, |id| Ok(partition.replies(id)?))?;

    if ctx.json() {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No messages.");
    }
    for entry in &entries {
        print_message(&entry.message, entry.depth);
    }
    Ok(())
}

/// Deeper replies print at this indentation.
const MAX_INDENT: usize = 24;

fn print_message(message: &Message, depth: usize) {
    let indent = "  ".repeat(depth.min(MAX_INDENT));
    let count = match message.like_count {
        n if n > 0 => format!("+{n}").green(),
        n if n < 0 => n.to_string().red(),
        _ => "0".dimmed(),
    };
    println!(
        "{indent}{} {} ({})",
        format!("#{}", message.id).yellow(),
        message.author.to_string().bold(),
        count
    );
    println!("{indent}  {}", message.content);
}

fn cmd_log(ctx: &Workspace, args: LogArgs) -> anyhow::Result<()> {
    let (_, partition) = ctx.open()?;
    let receipts = partition.receipts()?;
    let recent: Vec<&ActionReceipt> = receipts.iter().rev().take(args.limit).collect();

    if ctx.json() {
        return print_json(&recent);
    }
    if recent.is_empty() {
        println!("No actions recorded.");
    }
    for receipt in recent {
        println!(
            "{} {} {} {} -> {}",
            format!("r#{}", receipt.seq).yellow().bold(),
            receipt.short_hash().dimmed(),
            receipt.signed.action.kind().cyan(),
            receipt.signed.action.actor(),
            receipt.assigned_id
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct VerifyOutput {
    receipts: usize,
    replayed: u64,
    converged: bool,
}

fn cmd_verify(ctx: &Workspace) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let registry = config.registry()?;
    let snapshot: PartitionSnapshot =
        load_snapshot(&ctx.state_path(&config))?.unwrap_or_default();

    snapshot.journal.validate()?;
    let result = ReplayEngine::replay_verified(&snapshot.journal, &registry)?;
    let output = VerifyOutput {
        receipts: snapshot.journal.len(),
        replayed: result.applied,
        converged: result.state == snapshot.board,
    };

    if ctx.json() {
        print_json(&output)?;
    } else if output.converged {
        println!("{} Journal verified", "✓".green().bold());
        println!("  Hash chain: {}", "valid".green());
        println!("  Signatures: {}", "valid".green());
        println!(
            "  Replay: {} actions, {}",
            output.replayed,
            "converged".green()
        );
    } else {
        println!("{} Journal is valid but stored tables diverge from replay", "✗".red().bold());
    }

    if !output.converged {
        bail!("stored state does not match journal replay");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use talk_contract::{Authority, BoardState};

    use super::*;

    struct Board {
        _dir: tempfile::TempDir,
        config: PathBuf,
    }

    impl Board {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = dir.path().join("talk.toml");
            let board = Self { _dir: dir, config };
            board.run(&["init"]).unwrap();
            board
        }

        fn run(&self, args: &[&str]) -> anyhow::Result<()> {
            let config = self.config.to_str().unwrap();
            let argv = ["talk", "--config", config]
                .into_iter()
                .chain(args.iter().copied());
            run_command(Cli::try_parse_from(argv).unwrap())
        }

        fn ctx(&self) -> Workspace {
            Workspace::new(self.config.clone(), OutputFormat::Text)
        }

        fn message(&self, id: u64) -> Option<Message> {
            let (_, partition) = self.ctx().open().unwrap();
            partition.message(id).unwrap()
        }
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let board = Board::new();
        assert!(board.run(&["init"]).is_err());
        board.run(&["init", "--force"]).unwrap();
    }

    #[test]
    fn keygen_registers_account() {
        let board = Board::new();
        board.run(&["keygen", "alice"]).unwrap();

        let ctx = board.ctx();
        let config = ctx.load_config().unwrap();
        let alice = AccountName::new("alice").unwrap();
        assert!(config.accounts.contains_key(&alice));
        assert!(ctx.key_path(&config, &alice).exists());
        assert!(board.run(&["keygen", "alice"]).is_err());
    }

    #[test]
    fn post_reply_and_like_persist() {
        let board = Board::new();
        board.run(&["keygen", "alice"]).unwrap();
        board.run(&["keygen", "bob"]).unwrap();

        board.run(&["post", "--author", "alice", "hi"]).unwrap();
        board
            .run(&["post", "--author", "bob", "--reply-to", "1000000000", "re: hi"])
            .unwrap();
        board.run(&["like", "--voter", "bob", "1000000000"]).unwrap();
        assert!(board
            .run(&["like", "--voter", "bob", "1000000000", "--dislike"])
            .is_err());

        let root = board.message(1_000_000_000).unwrap();
        assert_eq!(root.like_count, 1);
        let reply = board.message(1_000_000_001).unwrap();
        assert_eq!(reply.reply_to, 1_000_000_000);

        board.run(&["show", "1000000000"]).unwrap();
        board.run(&["thread"]).unwrap();
        board.run(&["--format", "json", "log"]).unwrap();
        board.run(&["verify"]).unwrap();
    }

    #[test]
    fn post_without_key_fails() {
        let board = Board::new();
        assert!(board.run(&["post", "--author", "carol", "hello"]).is_err());
        assert!(board.message(1_000_000_000).is_none());
    }

    #[test]
    fn show_missing_message_fails() {
        let board = Board::new();
        assert!(board.run(&["show", "5"]).is_err());
    }

    #[test]
    fn verify_empty_board() {
        let board = Board::new();
        board.run(&["--format", "json", "verify"]).unwrap();
    }

    #[test]
    fn thread_walk_is_depth_first_in_id_order() {
        let board = Board::new();
        board.run(&["keygen", "alice"]).unwrap();
        board.run(&["post", "-a", "alice", "root"]).unwrap();
        board.run(&["post", "-a", "alice", "-r", "1000000000", "first"]).unwrap();
        board.run(&["post", "-a", "alice", "-r", "1000000001", "nested"]).unwrap();
        board.run(&["post", "-a", "alice", "--id", "7", "-r", "1000000000", "low id"]).unwrap();
        board.run(&["post", "-a", "alice", "second root"]).unwrap();

        let (_, partition) = board.ctx().open().unwrap();
        let entries = walk_threads(partition.replies(0).unwrap(), |id| {
            Ok(partition.replies(id)?)
        })
        .unwrap();
        let listing: Vec<(usize, u64)> = entries.iter().map(|e| (e.depth, e.message.id)).collect();
        assert_eq!(
            listing,
            vec![
                (0, 1_000_000_000),
                (1, 7),
                (1, 1_000_000_001),
                (2, 1_000_000_002),
                (0, 1_000_000_003),
            ]
        );
        board.run(&["thread", "1000000001"]).unwrap();
        board.run(&["--format", "json", "thread"]).unwrap();
    }

    #[test]
    fn deep_reply_chain_does_not_exhaust_the_stack() {
        let alice = AccountName::new("alice").unwrap();
        let auth = Authority::single(alice);
        let mut board = BoardState::new();
        let mut parent = 0;
        for _ in 0..100_000 {
            let reply = Action::Post(PostAction {
                id: 0,
                reply_to: parent,
                author: alice,
                content: String::new(),
            });
            parent = board.apply(&reply, &auth).unwrap();
        }

        let roots = board.replies(0).into_iter().cloned().collect();
        let entries =
            walk_threads(roots, |id| Ok(board.replies(id).into_iter().cloned().collect()))
                .unwrap();
        assert_eq!(entries.len(), 100_000);
        assert_eq!(entries.last().unwrap().depth, 99_999);
        assert_eq!(entries.last().unwrap().message.id, parent);
    }

    #[test]
    fn tampered_state_is_refused() {
        let board = Board::new();
        board.run(&["keygen", "alice"]).unwrap();
        board.run(&["post", "--author", "alice", "hi"]).unwrap();

        let ctx = board.ctx();
        let config = ctx.load_config().unwrap();
        let state = ctx.state_path(&config);
        let mut snapshot = load_snapshot(&state).unwrap().unwrap();
        snapshot.board = Default::default();
        save_snapshot(&state, &snapshot).unwrap();

        assert!(board.run(&["verify"]).is_err());
        assert!(board.run(&["show", "1000000000"]).is_err());
    }
}
