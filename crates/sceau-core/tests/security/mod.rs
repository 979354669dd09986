mod entropy_quality;
mod plaintext_masking;
