//! Raw and normalized gasless orders.

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_sol_types::SolStruct;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use vault_types::{hashed_eip712_message, normalize_address, serde_helpers::u256_decimal, TypedDataPayload};

use crate::{DomainSeparator, OrderError};

mod gpv2 {
	alloy_sol_types::sol! {
		/// GPv2 order struct as hashed by the settlement contract.
		struct Order {
			address sellToken;
			address buyToken;
			address receiver;
			uint256 sellAmount;
			uint256 buyAmount;
			uint32 validTo;
			bytes32 appData;
			uint256 feeAmount;
			string kind;
			bool partiallyFillable;
			string sellTokenBalance;
			string buyTokenBalance;
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
	Sell,
	Buy,
}

impl OrderKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderKind::Sell => "sell",
			OrderKind::Buy => "buy",
		}
	}
}

/// Where the settlement pulls sell tokens from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SellTokenBalance {
	Erc20,
	External,
	Internal,
}

impl SellTokenBalance {
	pub fn as_str(&self) -> &'static str {
		match self {
			SellTokenBalance::Erc20 => "erc20",
			SellTokenBalance::External => "external",
			SellTokenBalance::Internal => "internal",
		}
	}

	/// Absent means `erc20`. Case-insensitive.
	pub fn parse(value: Option<&str>) -> Result<Self, OrderError> {
		let Some(value) = value else {
			return Ok(SellTokenBalance::Erc20);
		};
		match value.trim().to_ascii_lowercase().as_str() {
			"erc20" => Ok(SellTokenBalance::Erc20),
			"external" => Ok(SellTokenBalance::External),
			"internal" => Ok(SellTokenBalance::Internal),
			_ => Err(OrderError::InvalidBalanceConfig(format!(
				"unknown sell token balance '{value}'"
			))),
		}
	}
}

/// Where the settlement sends bought tokens. `external` is folded into
/// `erc20` since the buy side has no external balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuyTokenBalance {
	Erc20,
	Internal,
}

impl BuyTokenBalance {
	pub fn as_str(&self) -> &'static str {
		match self {
			BuyTokenBalance::Erc20 => "erc20",
			BuyTokenBalance::Internal => "internal",
		}
	}

	pub fn parse(value: Option<&str>) -> Result<Self, OrderError> {
		let Some(value) = value else {
			return Ok(BuyTokenBalance::Erc20);
		};
		match value.trim().to_ascii_lowercase().as_str() {
			"erc20" | "external" => Ok(BuyTokenBalance::Erc20),
			"internal" => Ok(BuyTokenBalance::Internal),
			_ => Err(OrderError::InvalidBalanceConfig(format!(
				"unknown buy token balance '{value}'"
			))),
		}
	}
}

/// Expiry of an order, either as a UNIX timestamp or a date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidTo {
	Timestamp(u32),
	Date(DateTime<Utc>),
}

impl ValidTo {
	fn to_timestamp(&self) -> Result<u32, OrderError> {
		match self {
			ValidTo::Timestamp(ts) => Ok(*ts),
			ValidTo::Date(date) => {
				let seconds = date.timestamp();
				u32::try_from(seconds).map_err(|_| OrderError::InvalidValidTo(seconds))
			}
		}
	}
}

/// Application data attached to an order, as a number or raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppData {
	Number(U256),
	Bytes(Vec<u8>),
}

impl AppData {
	fn to_hash(&self) -> Result<B256, OrderError> {
		match self {
			AppData::Number(value) => Ok(B256::from(*value)),
			AppData::Bytes(bytes) if bytes.len() > 32 => Err(OrderError::InvalidAppData(bytes.len())),
			AppData::Bytes(bytes) => Ok(B256::left_padding_from(bytes)),
		}
	}
}

impl Default for AppData {
	fn default() -> Self {
		AppData::Number(U256::ZERO)
	}
}

/// An order intent as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
	pub sell_token: String,
	pub buy_token: String,
	/// Recipient of the bought tokens. Omitted or empty means the owner.
	pub receiver: Option<String>,
	pub sell_amount: U256,
	pub buy_amount: U256,
	pub valid_to: ValidTo,
	pub app_data: AppData,
	pub fee_amount: U256,
	pub kind: OrderKind,
	pub partially_fillable: bool,
	pub sell_token_balance: Option<String>,
	pub buy_token_balance: Option<String>,
}

impl Order {
	/// Canonical hashable form. Pure: equal inputs give equal outputs.
	pub fn normalize(&self) -> Result<NormalizedOrder, OrderError> {
		let receiver = match self.receiver.as_deref().map(str::trim) {
			None | Some("") => Address::ZERO,
			Some(raw) => {
				let receiver = normalize_address(raw);
				if receiver == Address::ZERO {
					return Err(OrderError::InvalidReceiver);
				}
				receiver
			}
		};

		Ok(NormalizedOrder {
			sell_token: normalize_address(&self.sell_token),
			buy_token: normalize_address(&self.buy_token),
			receiver,
			sell_amount: self.sell_amount,
			buy_amount: self.buy_amount,
			valid_to: self.valid_to.to_timestamp()?,
			app_data: self.app_data.to_hash()?,
			fee_amount: self.fee_amount,
			kind: self.kind,
			partially_fillable: self.partially_fillable,
			sell_token_balance: SellTokenBalance::parse(self.sell_token_balance.as_deref())?,
			buy_token_balance: BuyTokenBalance::parse(self.buy_token_balance.as_deref())?,
		})
	}
}

/// Order in the exact shape hashed and submitted to the orderbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedOrder {
	pub sell_token: Address,
	pub buy_token: Address,
	pub receiver: Address,
	#[serde(with = "u256_decimal")]
	pub sell_amount: U256,
	#[serde(with = "u256_decimal")]
	pub buy_amount: U256,
	pub valid_to: u32,
	pub app_data: B256,
	#[serde(with = "u256_decimal")]
	pub fee_amount: U256,
	pub kind: OrderKind,
	pub partially_fillable: bool,
	pub sell_token_balance: SellTokenBalance,
	pub buy_token_balance: BuyTokenBalance,
}

impl NormalizedOrder {
	fn as_sol(&self) -> gpv2::Order {
		gpv2::Order {
			sellToken: self.sell_token,
			buyToken: self.buy_token,
			receiver: self.receiver,
			sellAmount: self.sell_amount,
			buyAmount: self.buy_amount,
			validTo: self.valid_to,
			appData: self.app_data,
			feeAmount: self.fee_amount,
			kind: self.kind.as_str().to_string(),
			partiallyFillable: self.partially_fillable,
			sellTokenBalance: self.sell_token_balance.as_str().to_string(),
			buyTokenBalance: self.buy_token_balance.as_str().to_string(),
		}
	}

	/// EIP-712 type string of the order struct.
	pub fn encoded_type() -> String {
		gpv2::Order::eip712_encode_type().into_owned()
	}

	pub fn type_hash() -> B256 {
		keccak256(Self::encoded_type())
	}

	/// `hashStruct(order)` as defined by EIP-712.
	pub fn hash_struct(&self) -> B256 {
		self.as_sol().eip712_hash_struct()
	}

	pub fn typed_data(&self, domain: &DomainSeparator) -> TypedDataPayload {
		TypedDataPayload {
			domain_separator: domain.0,
			primary_type: "Order".to_string(),
			encoded_type: Self::encoded_type(),
			struct_hash: self.hash_struct(),
		}
	}

	/// Order digest signed by the owner.
	pub fn signing_hash(&self, domain: &DomainSeparator) -> B256 {
		hashed_eip712_message(&domain.0, &self.hash_struct())
	}

	/// 56-byte order identifier: `digest || owner || validTo`.
	pub fn uid(&self, domain: &DomainSeparator, owner: &Address) -> OrderUid {
		let mut uid = [0u8; 56];
		uid[0..32].copy_from_slice(self.signing_hash(domain).as_slice());
		uid[32..52].copy_from_slice(owner.as_slice());
		uid[52..56].copy_from_slice(&self.valid_to.to_be_bytes());
		OrderUid(uid)
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderUid(pub [u8; 56]);

impl fmt::Display for OrderUid {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(self.0))
	}
}

impl fmt::Debug for OrderUid {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

impl Serialize for OrderUid {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, b256, hex};
	use chrono::TimeZone;

	fn raw_order() -> Order {
		Order {
			sell_token: "0x0101010101010101010101010101010101010101".into(),
			buy_token: "0x0202020202020202020202020202020202020202".into(),
			receiver: Some("0x0303030303030303030303030303030303030303".into()),
			sell_amount: U256::from(0x0246ddf97976680000_u128),
			buy_amount: U256::from(0xb98bc829a6f90000_u128),
			valid_to: ValidTo::Timestamp(0xffffffff),
			app_data: AppData::Number(U256::ZERO),
			fee_amount: U256::from(0x0de0b6b3a7640000_u128),
			kind: OrderKind::Sell,
			partially_fillable: false,
			sell_token_balance: None,
			buy_token_balance: None,
		}
	}

	#[test]
	fn test_type_hash_matches_settlement_contract() {
		assert_eq!(
			NormalizedOrder::type_hash(),
			b256!("d5a25ba2e97094ad7d83dc28a6572da797d6b3e7fc6663bd93efb789fc17e489")
		);
	}

	#[test]
	fn test_order_uid() {
		let domain = DomainSeparator(b256!(
			"74e0b11bd18120612556bae4578cfd3a254d7e2495f543c569a92ff5794d9b09"
		));
		let owner = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
		let order = raw_order().normalize().unwrap();

		assert_eq!(
			order.uid(&domain, &owner).0,
			hex!("0e45d31fd31b28c26031cdd81b35a8938b2ccca2cc425fcf440fd3bfed1eede970997970c51812dc3a010c7d01b50e0d17dc79c8ffffffff")
		);
	}

	#[test]
	fn test_hash_is_deterministic() {
		let order = raw_order();
		let first = order.normalize().unwrap().hash_struct();
		let second = order.normalize().unwrap().hash_struct();
		assert_eq!(first, second);
	}

	#[test]
	fn test_receiver_rules() {
		let mut order = raw_order();

		order.receiver = None;
		assert_eq!(order.normalize().unwrap().receiver, Address::ZERO);

		order.receiver = Some("".into());
		assert_eq!(order.normalize().unwrap().receiver, Address::ZERO);

		order.receiver = Some("0x0000000000000000000000000000000000000000".into());
		assert!(matches!(order.normalize(), Err(OrderError::InvalidReceiver)));

		order.receiver = Some("not-an-address".into());
		assert!(matches!(order.normalize(), Err(OrderError::InvalidReceiver)));

		order.receiver = Some("0X0303030303030303030303030303030303030303".into());
		assert_eq!(
			order.normalize().unwrap().receiver,
			Address::repeat_byte(0x03)
		);
	}

	#[test]
	fn test_balance_coercion_table() {
		let sell_cases = [
			(None, SellTokenBalance::Erc20),
			(Some("erc20"), SellTokenBalance::Erc20),
			(Some("external"), SellTokenBalance::External),
			(Some("internal"), SellTokenBalance::Internal),
		];
		let buy_cases = [
			(None, BuyTokenBalance::Erc20),
			(Some("erc20"), BuyTokenBalance::Erc20),
			(Some("external"), BuyTokenBalance::Erc20),
			(Some("internal"), BuyTokenBalance::Internal),
		];

		for (sell_input, sell_expected) in sell_cases {
			for (buy_input, buy_expected) in buy_cases {
				let mut order = raw_order();
				order.sell_token_balance = sell_input.map(String::from);
				order.buy_token_balance = buy_input.map(String::from);
				let normalized = order.normalize().unwrap();
				assert_eq!(normalized.sell_token_balance, sell_expected);
				assert_eq!(normalized.buy_token_balance, buy_expected);
			}
		}
	}

	#[test]
	fn test_unknown_balance_rejected() {
		let mut order = raw_order();
		order.buy_token_balance = Some("vault".into());
		assert!(matches!(
			order.normalize(),
			Err(OrderError::InvalidBalanceConfig(_))
		));

		let mut order = raw_order();
		order.sell_token_balance = Some("ERC20".into());
		assert!(order.normalize().is_ok());
	}

	#[test]
	fn test_valid_to_from_date() {
		let mut order = raw_order();
		order.valid_to = ValidTo::Date(
			Utc.timestamp_millis_opt(1_700_000_000_999).single().unwrap(),
		);
		assert_eq!(order.normalize().unwrap().valid_to, 1_700_000_000);

		order.valid_to = ValidTo::Date(Utc.timestamp_opt(5_000_000_000, 0).single().unwrap());
		assert!(matches!(
			order.normalize(),
			Err(OrderError::InvalidValidTo(5_000_000_000))
		));
	}

	#[test]
	fn test_app_data_padding() {
		let mut order = raw_order();
		order.app_data = AppData::Number(U256::from(0x1234u64));
		let from_number = order.normalize().unwrap().app_data;

		order.app_data = AppData::Bytes(vec![0x12, 0x34]);
		let from_bytes = order.normalize().unwrap().app_data;

		assert_eq!(from_number, from_bytes);
		assert_eq!(from_number.as_slice()[30..], [0x12, 0x34]);

		order.app_data = AppData::Bytes(vec![0u8; 33]);
		assert!(matches!(order.normalize(), Err(OrderError::InvalidAppData(33))));
	}

	#[test]
	fn test_serializes_orderbook_shape() {
		let json = serde_json::to_value(raw_order().normalize().unwrap()).unwrap();
		assert_eq!(json["kind"], "sell");
		assert_eq!(json["sellTokenBalance"], "erc20");
		assert_eq!(json["validTo"], 0xffffffffu32);
		assert_eq!(json["sellAmount"], "42000000000000000000");
	}
}
