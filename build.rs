fn main() -> std::io::Result<()> {
    println!("cargo:rerun-if-changed=src/protos/");

    let mut config = prost_build::Config::new();

    let all_proto_files = std::fs::read_dir("src/protos")
        .expect("Failed to read protos directory")
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            if path.extension()?.to_str()? == "proto" {
                Some(path.to_string_lossy().to_string())
            } else {
                None
            }
        })
        .collect::<Vec<_>>();

    println!(
        "Compiling all {} protobuf files together for proper dependency resolution",
        all_proto_files.len()
    );

    match config
        .enable_type_names()
        .include_file("iwork_protos.rs")
        .compile_protos(&all_proto_files, &["src/protos"])
    {
        Ok(_) => println!("Successfully compiled all protobuf files"),
        Err(e) => {
            eprintln!("Failed to compile protobuf files: {}\n", e);
            panic!("Protobuf compilation failed - check for syntax errors in .proto files");
        },
    }

    Ok(())
}
