fn main() -> std::io::Result<()> {
    println!("cargo:rerun-if-changed=proto/tailfs.proto");
    let fds = protox::compile(["proto/tailfs.proto"], ["proto"])
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    tonic_prost_build::compile_fds(fds)
}
