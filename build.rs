fn main() {
    // Embed the application icon on Windows when one is shipped
    #[cfg(target_os = "windows")]
    {
        let mut res = winres::WindowsResource::new();
        res.set("ProductName", "IPTV Browser");
        res.set("FileDescription", "Desktop IPTV channel browser");

        if std::path::Path::new("assets/icon.ico").exists() {
            res.set_icon("assets/icon.ico");
        }

        if let Err(e) = res.compile() {
            eprintln!("Warning: Failed to embed resources: {}", e);
        }
    }
}
