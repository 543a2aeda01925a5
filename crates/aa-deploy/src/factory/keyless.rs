//! Presigned keyless deployment transactions (Nick's method).
//!
//! A keyless deployment is a legacy contract-creation transaction signed with a made-up,
//! pre-EIP-155 signature (`v` = 27 or 28, no chain id). Nobody knows the private key of the
//! account recovered from that signature, so the account can only ever send this one
//! transaction at nonce 0, and the contract it creates lands at the same address on every chain
//! that accepts unprotected transactions.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::{Decodable, Encodable, Header};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

/// Errors raised while decoding or recovering a keyless deployment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum KeylessTxError {
    /// Not a well-formed RLP legacy transaction
    #[error("malformed RLP encoding")]
    MalformedEncoding,
    /// The `to` field is set
    #[error("not a contract creation")]
    NotContractCreation,
    /// `v` is not 27 or 28
    #[error("not a pre-EIP-155 transaction")]
    NotPreEip155,
    /// No public key can be recovered from the signature
    #[error("invalid signature")]
    InvalidSignature,
}

/// A decoded pre-EIP-155 contract-creation transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeylessTx {
    /// Nonce, 0 for every real keyless deployment
    pub nonce: u64,
    /// Gas price in wei
    pub gas_price: u128,
    /// Gas limit
    pub gas_limit: u64,
    /// Value sent along with the creation
    pub value: U256,
    /// Init code of the created contract
    pub init_code: Bytes,
    /// 27 or 28
    pub v: u8,
    /// Signature r
    pub r: U256,
    /// Signature s
    pub s: U256,
}

impl KeylessTx {
    /// Decodes `[nonce, gasPrice, gasLimit, to, value, data, v, r, s]`.
    pub fn decode(raw: &[u8]) -> Result<Self, KeylessTxError> {
        let mut buf = raw;
        let header = Header::decode(&mut buf).map_err(|_| KeylessTxError::MalformedEncoding)?;
        if !header.list || buf.len() != header.payload_length {
            return Err(KeylessTxError::MalformedEncoding);
        }

        let nonce = decode_field(&mut buf)?;
        let gas_price = decode_field(&mut buf)?;
        let gas_limit = decode_field(&mut buf)?;

        // Contract creation: `to` must be the empty string
        let to = Header::decode(&mut buf).map_err(|_| KeylessTxError::MalformedEncoding)?;
        if to.list || to.payload_length != 0 {
            return Err(KeylessTxError::NotContractCreation);
        }

        let value = decode_field(&mut buf)?;
        let init_code = decode_field(&mut buf)?;
        let v: u64 = decode_field(&mut buf)?;
        let r = decode_field(&mut buf)?;
        let s = decode_field(&mut buf)?;

        if !buf.is_empty() {
            return Err(KeylessTxError::MalformedEncoding);
        }
        let v = match v {
            27 | 28 => v as u8,
            _ => return Err(KeylessTxError::NotPreEip155),
        };

        Ok(Self { nonce, gas_price, gas_limit, value, init_code, v, r, s })
    }

    /// The hash the signature commits to: `keccak256(rlp([nonce, gasPrice, gasLimit, "",
    /// value, data]))`.
    pub fn signing_hash(&self) -> B256 {
        let to = Bytes::new();
        let fields: [&dyn Encodable; 6] =
            [&self.nonce, &self.gas_price, &self.gas_limit, &to, &self.value, &self.init_code];
        let mut out = Vec::new();
        alloy_rlp::encode_list::<_, dyn Encodable>(&fields, &mut out);
        keccak256(out)
    }

    /// Recovers the account that "signed" the transaction.
    pub fn recover_signer(&self) -> Result<Address, KeylessTxError> {
        let mut sig_bytes = [0u8; 64];
        sig_bytes[..32].copy_from_slice(&self.r.to_be_bytes::<32>());
        sig_bytes[32..].copy_from_slice(&self.s.to_be_bytes::<32>());

        let recovery_id = self
            .v
            .checked_sub(27)
            .and_then(|id| RecoveryId::try_from(id).ok())
            .ok_or(KeylessTxError::InvalidSignature)?;
        let signature =
            Signature::from_slice(&sig_bytes).map_err(|_| KeylessTxError::InvalidSignature)?;
        let prehash = self.signing_hash();
        let key = VerifyingKey::recover_from_prehash(prehash.as_slice(), &signature, recovery_id)
            .map_err(|_| KeylessTxError::InvalidSignature)?;

        // Uncompressed point is 0x04 || x || y, the address hashes x || y
        let point = key.to_encoded_point(false);
        Ok(Address::from_slice(&keccak256(&point.as_bytes()[1..])[12..]))
    }

    /// Wei the signer must hold for the transaction to be included.
    pub fn upfront_cost(&self) -> U256 {
        U256::from(self.gas_price) * U256::from(self.gas_limit) + self.value
    }
}

fn decode_field<T: Decodable>(buf: &mut &[u8]) -> Result<T, KeylessTxError> {
    T::decode(buf).map_err(|_| KeylessTxError::MalformedEncoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::CANONICAL_FACTORY_TX;
    use alloy_primitives::{address, bytes, hex};

    /// Post-EIP-155 transaction with chain ID 1 (v=0x26=38).
    /// Generated: cast mktx --private-key 0x0123..def --legacy --chain 1 --create 0x6080604052
    const POST_EIP155_CHAIN_1_TX: &[u8] = &hex!("f856808504a817c800830186a0808085608060405226a0fceb37453e90ac5ec2780748b7a4907b1dcfb87708697de2e6be19831938c77ba0224ee4c1aaa6a1490b4e3a1fbed7c5151668a12b6f6e3227c2692a64cf79e81f");

    /// Legacy transfer to 0x4242...42.
    /// Generated: cast mktx --private-key 0x0123..def --legacy 0x4242424242424242424242424242424242424242
    const NON_CONTRACT_CREATION_TX: &[u8] = &hex!("f866808504a817c800825208944242424242424242424242424242424242424242808082072ba094a1d148b08c268261581dd9e90478bae0c937e26eec574809876bdd34de82daa03e2fb4dd2cb99703feeb0da3c3a1062a047f0091aa09610c3a7feecfda6f6bad");

    #[test]
    fn test_decode_canonical_factory_tx() {
        let tx = KeylessTx::decode(CANONICAL_FACTORY_TX).unwrap();
        assert_eq!(tx.nonce, 0);
        assert_eq!(tx.gas_price, 100_000_000_000);
        assert_eq!(tx.gas_limit, 100_000);
        assert_eq!(tx.value, U256::ZERO);
        assert_eq!(tx.v, 27);
        assert_eq!(tx.r, tx.s);
        assert_eq!(
            tx.init_code,
            bytes!("604580600e600039806000f350fe7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffe03601600081602082378035828234f58015156039578182fd5b8082525050506014600cf3")
        );
    }

    #[test]
    fn test_recover_canonical_signer() {
        let tx = KeylessTx::decode(CANONICAL_FACTORY_TX).unwrap();
        let signer = tx.recover_signer().unwrap();
        assert_eq!(signer, address!("3fab184622dc19b6109349b94811493bf2a45362"));
        assert_eq!(signer.create(0), address!("4e59b44847b379578588920ca78fbf26c0b4956c"));
    }

    #[test]
    fn test_recover_rejects_out_of_range_v() {
        let canonical = KeylessTx::decode(CANONICAL_FACTORY_TX).unwrap();
        for v in [0, 26] {
            let tx = KeylessTx { v, ..canonical.clone() };
            assert_eq!(tx.recover_signer(), Err(KeylessTxError::InvalidSignature));
        }
    }

    #[test]
    fn test_upfront_cost() {
        let tx = KeylessTx::decode(CANONICAL_FACTORY_TX).unwrap();
        // 100 gwei * 100k gas
        assert_eq!(tx.upfront_cost(), U256::from(10_000_000_000_000_000u128));
    }

    #[test]
    fn test_rejects_replay_protected() {
        assert_eq!(KeylessTx::decode(POST_EIP155_CHAIN_1_TX), Err(KeylessTxError::NotPreEip155));
    }

    #[test]
    fn test_rejects_call() {
        assert_eq!(
            KeylessTx::decode(NON_CONTRACT_CREATION_TX),
            Err(KeylessTxError::NotContractCreation)
        );
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(KeylessTx::decode(&hex!("deadbeef")), Err(KeylessTxError::MalformedEncoding));
        assert_eq!(KeylessTx::decode(&[]), Err(KeylessTxError::MalformedEncoding));
        let truncated = &CANONICAL_FACTORY_TX[..CANONICAL_FACTORY_TX.len() - 10];
        assert_eq!(KeylessTx::decode(truncated), Err(KeylessTxError::MalformedEncoding));
    }
}
