//! Add a target with one LUN to an ietd.conf file
//!
//! Usage: cargo run --example edit_config -- <ietd.conf> <iqn> <lun path> [type]
//!
//! The file is created if it does not exist. Comments and blank lines in an
//! existing file are kept as they are.

use iet_config::{ConfigStore, IetError, LunSpec};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "ietd.conf".to_string());
    let iqn = args
        .next()
        .unwrap_or_else(|| "iqn.2025-12.local:storage.disk1".to_string());
    let lun_path = args.next().unwrap_or_else(|| "/dev/sdb".to_string());
    let io_type = args.next().unwrap_or_else(|| "blockio".to_string());

    let mut store = ConfigStore::builder().create_missing(true).build_file(&path)?;
    let mut target = store.target(&iqn);

    match target.add_target(store.document_mut()) {
        Ok(_) => println!("Added target {}", iqn),
        Err(IetError::Duplication(_)) => println!("Target {} already exists", iqn),
        Err(e) => return Err(e.into()),
    }

    let id = target.add_lun(
        store.document_mut(),
        &LunSpec::new(lun_path.as_str()).io_type(io_type.as_str()),
    )?;
    println!("Mapped {} as LUN {}", lun_path, id);

    store.write()?;

    println!("\n{}:", path);
    for lun in target.luns(store.document(), None)?.unwrap_or_default() {
        println!(
            "  Lun {} -> {} ({})",
            lun.id,
            lun.path().unwrap_or("?"),
            lun.io_type().unwrap_or("default")
        );
    }

    Ok(())
}
