//! Key management commands.
//!
//! `tessera keys generate` - Generate a new Ed25519 signing key.

use std::fmt::Write;
use std::fs;
use std::path::PathBuf;
use tessera_token::SigningKeyPair;

/// Generate a new signing key, writing it to `output` when given.
pub fn generate(output: Option<PathBuf>, name: &str) -> anyhow::Result<String> {
    let keypair = SigningKeyPair::generate();
    let mut out = String::new();

    if let Some(output_dir) = output {
        fs::create_dir_all(&output_dir)?;

        let private_path = output_dir.join(format!("{}.key", name));
        let public_path = output_dir.join(format!("{}.pub", name));
        keypair.save_to_files(&private_path, &public_path)?;

        writeln!(out, "✔ Generated Ed25519 signing key (kid {}):", keypair.kid())?;
        writeln!(out, "  Private key: {}", private_path.display())?;
        writeln!(out, "  Public key:  {}", public_path.display())?;
        writeln!(out)?;
        writeln!(out, "⚠️  Keep your private key secure! Never commit it to version control.")?;
        writeln!(out)?;
        writeln!(out, "Reference it from tessera.yaml:")?;
        writeln!(out, "  keys:")?;
        writeln!(out, "    tenants:")?;
        writeln!(out, "      <tenant_id>:")?;
        write!(out, "        private_key_file: {}", private_path.display())?;
    } else {
        writeln!(out, "Key ID: {}", keypair.kid())?;
        writeln!(out)?;
        writeln!(out, "Private key (keep secure!):")?;
        writeln!(out, "{}", keypair.private_key_hex().as_str())?;
        writeln!(out)?;
        writeln!(out, "Public key:")?;
        writeln!(out, "{}", keypair.public_key_hex())?;
        writeln!(out)?;
        write!(out, "Use --output <dir> to save keys to files.")?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_generate_keys_to_files() {
        let dir = tempdir().unwrap();
        let out = generate(Some(dir.path().to_path_buf()), "ins_1").unwrap();

        let private_hex = fs::read_to_string(dir.path().join("ins_1.key")).unwrap();
        let public_hex = fs::read_to_string(dir.path().join("ins_1.pub")).unwrap();

        // Hex keys should be 64 characters (32 bytes)
        assert_eq!(private_hex.len(), 64);
        assert_eq!(public_hex.len(), 64);

        let loaded = SigningKeyPair::from_private_key_hex(&private_hex).unwrap();
        assert!(out.contains(loaded.kid()));
    }

    #[test]
    fn test_generate_to_stdout() {
        let out = generate(None, "signing").unwrap();
        assert!(out.contains("Private key"));
        assert!(out.contains("Public key"));
    }
}
