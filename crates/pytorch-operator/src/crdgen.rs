use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("pytorchjob_crd.yaml"));

    let yaml = pytorch_operator::crd::to_yaml()?;
    std::fs::write(&path, yaml)?;
    println!("wrote {}", path.display());
    Ok(())
}
