fn main() -> anyhow::Result<()> {
    skp_dashboard_lib::run()
}
