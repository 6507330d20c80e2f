mod client;
mod ops;

use clap::{Parser, Subcommand};
use idgate_core::UserType;
use ops::{
    create_user, delete_user, get_user, list_users, login, me, register, update_user, verify,
    verify_token, NewUserArgs, OutputFormat,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI wrapper around the idgate HTTP API.
#[derive(Parser)]
#[command(name = "idgate-cli", author, version, about = "CLI for the idgate identity API")]
struct Cli {
    /// API base url
    #[arg(long, env = "IDG_API_BASE", default_value = "http://127.0.0.1:8080")]
    api_base: String,

    /// Bearer token for authentication
    #[arg(long, env = "IDG_TOKEN")]
    token: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    // ==================== 认证 ====================
    /// 注册账号（验证码发送到邮箱）
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long, short)]
        email: String,
        #[arg(long, short)]
        password: String,
    },
    /// 提交邮箱验证码，完成注册
    Verify {
        #[arg(long, short)]
        email: String,
        #[arg(long, short)]
        code: String,
    },
    /// 用户登录，获取 access token
    Login {
        #[arg(long, short)]
        email: String,
        #[arg(long, short)]
        password: String,
    },
    /// 校验 token 并查询权限（默认校验 --token）
    VerifyToken {
        /// 资源
        #[arg(long, short)]
        resource: String,
        /// 动作
        #[arg(long, short)]
        action: String,
        /// 要校验的 token；缺省使用全局 --token
        #[arg(long)]
        access_token: Option<String>,
    },
    /// 查看当前用户
    Me,

    // ==================== 用户管理（仅管理员）====================
    /// 用户管理命令
    #[command(subcommand)]
    User(UserCommands),
}

#[derive(Subcommand)]
enum UserCommands {
    /// 分页列出用户
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        /// 按姓名、邮箱、用户名、电话模糊搜索
        #[arg(long, short)]
        search: Option<String>,
    },
    /// 获取用户详情
    Get { id: i64 },
    /// 直接创建用户（跳过邮箱验证）
    Create {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long, short)]
        email: String,
        #[arg(long, short)]
        password: String,
        #[arg(long)]
        phone_number: Option<String>,
        #[arg(long)]
        username: Option<String>,
        /// user、admin 或自定义角色名
        #[arg(long = "type", default_value = "user")]
        user_type: UserType,
    },
    /// 更新用户资料（传空字符串清空可选字段）
    Update {
        id: i64,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        phone_number: Option<String>,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        profile_image_url: Option<String>,
    },
    /// 删除用户
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载 .env 文件（如果存在），忽略错误
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();
    let client = client::build_client(&cli.token)?;
    let base = cli.api_base.trim_end_matches('/');

    match cli.command {
        Commands::Register {
            first_name,
            last_name,
            email,
            password,
        } => {
            register(
                &client,
                base,
                &first_name,
                &last_name,
                &email,
                &password,
                cli.output,
            )
            .await?
        }
        Commands::Verify { email, code } => {
            verify(&client, base, &email, &code, cli.output).await?
        }
        Commands::Login { email, password } => {
            login(&client, base, &email, &password, cli.output).await?
        }
        Commands::VerifyToken {
            resource,
            action,
            access_token,
        } => {
            let Some(token) = access_token.or(cli.token) else {
                anyhow::bail!("请提供 --access-token 或设置 IDG_TOKEN");
            };
            verify_token(&client, base, &token, &resource, &action, cli.output).await?
        }
        Commands::Me => me(&client, base, cli.output).await?,

        Commands::User(user_cmd) => match user_cmd {
            UserCommands::List {
                page,
                limit,
                search,
            } => list_users(&client, base, page, limit, search.as_deref(), cli.output).await?,
            UserCommands::Get { id } => get_user(&client, base, id, cli.output).await?,
            UserCommands::Create {
                first_name,
                last_name,
                email,
                password,
                phone_number,
                username,
                user_type,
            } => {
                let args = NewUserArgs {
                    first_name,
                    last_name,
                    email,
                    password,
                    phone_number,
                    username,
                    user_type,
                };
                create_user(&client, base, &args, cli.output).await?
            }
            UserCommands::Update {
                id,
                first_name,
                last_name,
                phone_number,
                gender,
                username,
                profile_image_url,
            } => {
                let fields = [
                    ("first_name", first_name),
                    ("last_name", last_name),
                    ("phone_number", phone_number),
                    ("gender", gender),
                    ("username", username),
                    ("profile_image_url", profile_image_url),
                ];
                update_user(&client, base, id, &fields, cli.output).await?
            }
            UserCommands::Delete { id } => delete_user(&client, base, id).await?,
        },
    }

    Ok(())
}

fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clap_parses() {
        let cli = Cli::parse_from(["idgate-cli", "verify", "-e", "ann@x.com", "-c", "012345"]);
        assert!(matches!(
            cli.command,
            Commands::Verify { ref code, .. } if code == "012345"
        ));
    }

    #[test]
    fn user_create_parses_type() {
        let cli = Cli::parse_from([
            "idgate-cli",
            "--output",
            "json",
            "user",
            "create",
            "--first-name",
            "Root",
            "--last-name",
            "Admin",
            "-e",
            "root@x.com",
            "-p",
            "Secret1!",
            "--type",
            "admin",
        ]);
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::User(UserCommands::Create { user_type, .. }) => {
                assert_eq!(user_type, UserType::Admin)
            }
            _ => panic!("expected user create"),
        }
    }

    #[test]
    fn user_create_accepts_custom_type() {
        let cli = Cli::parse_from([
            "idgate-cli", "user", "create", "--first-name", "Eve", "--last-name", "Ed", "-e",
            "eve@x.com", "-p", "Secret1!", "--type", "editor",
        ]);
        match cli.command {
            Commands::User(UserCommands::Create { user_type, .. }) => {
                assert_eq!(user_type.as_str(), "editor")
            }
            _ => panic!("expected user create"),
        }
    }

    #[test]
    fn user_list_defaults() {
        let cli = Cli::parse_from(["idgate-cli", "user", "list"]);
        match cli.command {
            Commands::User(UserCommands::List { page, limit, search }) => {
                assert_eq!((page, limit), (1, 10));
                assert!(search.is_none());
            }
            _ => panic!("expected user list"),
        }
    }
}
