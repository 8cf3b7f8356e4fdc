// === Entry point for desktop ===
#[tokio::main(flavor = "multi_thread")]
pub async fn main() {
    super::run::native_main().await;
}
