use std::net::SocketAddr;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:data/giftwish.db".to_string());

    let pool = giftwish::db::init_pool(&database_url).await;

    // Account provisioning happens from the command line; registration is
    // not part of the web surface.
    let args: Vec<String> = std::env::args().collect();
    if let Some(cmd) = args.get(1) {
        match (cmd.as_str(), args.get(2), args.get(3)) {
            ("create-user", Some(name), Some(email)) => {
                if let Err(e) = giftwish::cli::create_user(&pool, name, email).await {
                    eprintln!("Failed to create user: {e}");
                    std::process::exit(1);
                }
                return;
            }
            _ => {
                eprintln!("Usage: giftwish [create-user <name> <email>]");
                std::process::exit(1);
            }
        }
    }

    let secure_cookies = std::env::var("SECURE_COOKIES")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let app = giftwish::build_app(pool, secure_cookies).await;

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    let listener = TcpListener::bind(addr).await.unwrap();

    tracing::info!("listening on {}", addr);
    axum::serve(listener, app).await.unwrap();
}
