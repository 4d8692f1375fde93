use std::io::{self, BufRead, Write};

use chrono::{DateTime, Local};
use color_eyre::eyre::{Context, Result};
use murmur_core::{Action, ChatType, Reply, Request, UserId};
use murmur_service::{MurmurService, ServiceConfig};
use owo_colors::OwoColorize;

fn print_banner() {
    let banner = r#"
  _ __ ___  _   _ _ __ _ __ ___  _   _ _ __
 | '_ ` _ \| | | | '__| '_ ` _ \| | | | '__|
 | | | | | | |_| | |  | | | | | | |_| | |
 |_| |_| |_|\__,_|_|  |_| |_| |_|\__,_|_|
"#;
    println!("{}", banner.bright_green());
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .from_env_lossy()
                .add_directive("murmur_cli=info".parse()?)
                .add_directive("murmur_service=info".parse()?)
                .add_directive("murmur_db=info".parse()?),
        )
        .init();

    tracing::info!("Starting murmur");

    let config = ServiceConfig::from_env().wrap_err("Invalid configuration")?;
    let service = MurmurService::new(config)
        .await
        .wrap_err("Failed to open the message store")?;

    // `murmur-cli --json` reads one request per line and writes one reply per line.
    if std::env::args().any(|arg| arg == "--json") {
        return serve_lines(&service).await;
    }

    print_banner();
    let mut session: Option<UserId> = None;

    loop {
        print_menu(session);
        let choice = read_line("Choice: ")?;

        let action = match choice.trim() {
            "1" => send_code()?,
            "2" => verify_code()?,
            "3" => register()?,
            "4" => search_users()?,
            "5" => friend_action(true)?,
            "6" => friend_action(false)?,
            "7" => Some(Action::ListFriends),
            "8" => Some(Action::ListRequests),
            "9" => create_chat()?,
            "10" => send_message()?,
            "11" => list_messages()?,
            "12" => Some(Action::ListChats),
            "13" => {
                let line = read_line("Request JSON: ")?;
                let reply = service.handle_line(&line).await;
                print!("{}", reply.to_line());
                None
            }
            "0" => {
                println!("👋 Shutting down...");
                service.db().close().await;
                break;
            }
            _ => {
                println!("❌ Invalid choice");
                None
            }
        };

        if let Some(action) = action {
            let reply = service.handle(Request::new(session, action)).await;
            if let Some(user_id) = signed_in_as(&reply) {
                session = Some(user_id);
                println!("🔑 Signed in as user {}", user_id);
            }
            print_reply(&reply);
        }
    }

    Ok(())
}

async fn serve_lines(service: &MurmurService) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = service.handle_line(&line).await;
        stdout.write_all(reply.to_line().as_bytes())?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_menu(session: Option<UserId>) {
    let who = session
        .map(|id| format!("user {id}"))
        .unwrap_or_else(|| "not signed in".into());
    println!();
    println!("╔════════════════════════════════════╗");
    println!("║            MURMUR CLI              ║");
    println!("╠════════════════════════════════════╣");
    println!("║  1. Send Code                      ║");
    println!("║  2. Verify Code                    ║");
    println!("║  3. Register                       ║");
    println!("║  4. Search Users                   ║");
    println!("║  5. Send Friend Request            ║");
    println!("║  6. Accept Friend Request          ║");
    println!("║  7. List Friends                   ║");
    println!("║  8. Incoming Requests              ║");
    println!("║  9. Create Chat                    ║");
    println!("║ 10. Send Message                   ║");
    println!("║ 11. List Messages                  ║");
    println!("║ 12. List Chats                     ║");
    println!("║ 13. Raw JSON Request               ║");
    println!("║  0. Exit                           ║");
    println!("╚════════════════════════════════════╝");
    println!("  ({})", who.dimmed());
}

fn signed_in_as(reply: &Reply) -> Option<UserId> {
    match reply {
        Reply::Verified {
            user: Some(user), ..
        } => Some(user.id),
        Reply::Registered { user } => Some(user.id),
        _ => None,
    }
}

fn print_reply(reply: &Reply) {
    match reply {
        Reply::CodeSent {
            phone,
            expires_at,
            dev_code,
        } => {
            println!(
                "📨 Code for {}: {} (valid until {})",
                phone,
                dev_code.bold(),
                format_time(*expires_at)
            );
        }
        Reply::Verified {
            user_exists: false, ..
        } => println!("✅ Phone verified, register to continue"),
        Reply::Verified { user, .. } => {
            if let Some(user) = user {
                println!("✅ Welcome back, {} (@{})", user.nickname, user.username);
            }
        }
        Reply::Registered { user } => {
            println!("✅ Registered {} (@{}) as user {}", user.nickname, user.username, user.id);
        }
        Reply::Users { users } => {
            if users.is_empty() {
                println!("📭 No users found");
            }
            for user in users {
                println!("  👤 {} - {} (@{})", user.id, user.nickname, user.username);
            }
        }
        Reply::RequestSent => println!("📤 Friend request sent"),
        Reply::RequestAccepted => println!("🤝 Friend request accepted"),
        Reply::Friends { friends } | Reply::Requests { requests: friends } => {
            if friends.is_empty() {
                println!("📭 Nobody here yet");
            }
            for friend in friends {
                println!(
                    "  👤 {} - {} (@{}) [{}]",
                    friend.id, friend.nickname, friend.username, friend.status
                );
            }
        }
        Reply::ChatCreated { chat_id } => println!("💬 Created chat {}", chat_id),
        Reply::MessageSent { message } => {
            println!("📤 Message {} sent at {}", message.id, format_time(message.created_at));
        }
        Reply::Messages { messages } => {
            if messages.is_empty() {
                println!("📭 No messages found");
            }
            for msg in messages {
                println!(
                    "  [{}] {}: {}",
                    format_time(msg.created_at).dimmed(),
                    msg.nickname.as_deref().unwrap_or("?").bright_cyan(),
                    msg.text
                );
            }
        }
        Reply::Chats { chats } => {
            if chats.is_empty() {
                println!("📭 No chats found");
            }
            for chat in chats {
                println!(
                    "  💬 {} {} [{}] {} members, active {}",
                    chat.id,
                    chat.name.as_deref().unwrap_or("(private)"),
                    chat.chat_type,
                    chat.member_count,
                    format_time(chat.updated_at)
                );
            }
        }
        Reply::Error { kind, message } => {
            println!("{} {:?}: {}", "❌".red(), kind, message.red());
        }
    }
}

fn format_time(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn send_code() -> Result<Option<Action>> {
    let phone = read_line("Phone: ")?;
    Ok(Some(Action::SendCode {
        phone: non_empty(phone),
    }))
}

fn verify_code() -> Result<Option<Action>> {
    let phone = read_line("Phone: ")?;
    let code = read_line("Code: ")?;
    Ok(Some(Action::VerifyCode {
        phone: non_empty(phone),
        code: non_empty(code),
    }))
}

fn register() -> Result<Option<Action>> {
    let phone = read_line("Phone: ")?;
    let nickname = read_line("Nickname: ")?;
    let username = read_line("Username: ")?;
    Ok(Some(Action::Register {
        phone: non_empty(phone),
        nickname: non_empty(nickname),
        username: non_empty(username),
    }))
}

fn search_users() -> Result<Option<Action>> {
    let search = read_line("Search (empty for all): ")?;
    Ok(Some(Action::SearchUsers {
        search: non_empty(search),
    }))
}

fn friend_action(send: bool) -> Result<Option<Action>> {
    let Some(friend_id) = read_id("Friend user ID: ")? else {
        return Ok(None);
    };
    Ok(Some(if send {
        Action::SendRequest {
            friend_id: Some(friend_id),
        }
    } else {
        Action::AcceptRequest {
            friend_id: Some(friend_id),
        }
    }))
}

fn create_chat() -> Result<Option<Action>> {
    let chat_type = match read_line("Type (private/group) [private]: ")?.as_str() {
        "" => ChatType::Private,
        other => match other.parse::<ChatType>() {
            Ok(chat_type) => chat_type,
            Err(e) => {
                println!("❌ {}", e);
                return Ok(None);
            }
        },
    };
    let name = read_line("Name (optional): ")?;
    let members = read_line("Member IDs (comma separated): ")?;

    let mut member_ids = Vec::new();
    for part in members.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.parse::<UserId>() {
            Ok(id) => member_ids.push(id),
            Err(_) => {
                println!("❌ Not a user ID: {}", part);
                return Ok(None);
            }
        }
    }

    Ok(Some(Action::CreateChat {
        chat_type: Some(chat_type),
        name: non_empty(name),
        member_ids,
    }))
}

fn send_message() -> Result<Option<Action>> {
    let Some(chat_id) = read_id("Chat ID: ")? else {
        return Ok(None);
    };
    let text = read_line("Message: ")?;
    Ok(Some(Action::SendMessage {
        chat_id: Some(chat_id),
        text: non_empty(text),
    }))
}

fn list_messages() -> Result<Option<Action>> {
    let Some(chat_id) = read_id("Chat ID: ")? else {
        return Ok(None);
    };
    Ok(Some(Action::ListMessages {
        chat_id: Some(chat_id),
    }))
}

fn non_empty(input: String) -> Option<String> {
    if input.trim().is_empty() {
        None
    } else {
        Some(input)
    }
}

fn read_id(prompt: &str) -> Result<Option<i64>> {
    let input = read_line(prompt)?;
    match input.parse::<i64>() {
        Ok(id) => Ok(Some(id)),
        Err(_) => {
            println!("❌ Not a number: {}", input);
            Ok(None)
        }
    }
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
