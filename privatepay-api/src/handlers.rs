//! API route handlers.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use tracing::{debug, info};

use privatepay_core::traits::{
    AliasDirectory, AnnouncementRegistry, MetaAddressDirectory, MetaAddressRegistrar,
    TransactionStore,
};
use privatepay_core::types::{
    current_timestamp, EthAddress, MetaAddress, PaymentAnnouncement, RegisteredMetaAddress,
    SecpPublicKey, SecpSecretKey, TransactionRecord, TxHash, TxStatus,
};
use privatepay_crypto::address_from_secret_key;
use privatepay_stealth::{
    create_stealth_payment, parse_ether, parse_payment_link, resolve_recipient, validate_alias,
    validate_payment_link, ParsedPaymentLink, PaymentLink,
};

use crate::dto::*;
use crate::error::ApiError;
use crate::state::AppState;

type Result<T> = std::result::Result<T, ApiError>;

/// JSON body whose rejection is reported in the API error format.
type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;

const DEFAULT_PAGE_SIZE: usize = 100;
const MAX_PAGE_SIZE: usize = 1000;

fn strip_hex_prefix(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2 && s.get(..2).map(|p| p.eq_ignore_ascii_case("0x")) == Some(true) {
        &s[2..]
    } else {
        s
    }
}

fn parse_amount(amount: Option<&str>) -> Result<Option<u128>> {
    amount
        .map(parse_ether)
        .transpose()
        .map_err(|e| ApiError::bad_request(format!("Invalid amount: {}", e)))
}

fn parse_address(s: &str) -> Result<EthAddress> {
    Ok(EthAddress::from_hex(s)?)
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEYS & STEALTH
// ═══════════════════════════════════════════════════════════════════════════════

/// POST /api/v1/keys/generate
pub async fn generate_keys(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GenerateKeysResponse>> {
    let keys = state.engine.generate_meta_address()?;

    let response = GenerateKeysResponse {
        spend_public_key: keys.spend.public.to_hex(),
        spend_secret_key: keys.spend.secret.to_hex(),
        viewing_public_key: keys.viewing.public.to_hex(),
        viewing_secret_key: keys.viewing.secret.to_hex(),
        meta_address: keys.meta_address().to_hex(),
    };

    info!("Generated new PrivatePay keys");
    Ok(Json(response))
}

/// Finds the registration a stealth payment should target.
async fn resolve_target(
    state: &AppState,
    req: &CreateStealthRequest,
) -> Result<RegisteredMetaAddress> {
    if let Some(alias) = &req.alias {
        let resolved =
            resolve_recipient(&state.aliases, &state.meta_addresses, alias, req.index).await?;
        return Ok(resolved.meta_address);
    }

    let owner = req
        .recipient
        .ok_or_else(|| ApiError::bad_request("one of alias or recipient is required"))?;

    if let Some(meta_hex) = &req.meta_address {
        return Ok(RegisteredMetaAddress {
            owner,
            index: req.index.unwrap_or(0),
            meta_address: MetaAddress::from_hex(meta_hex)?,
            created_at: current_timestamp(),
        });
    }

    match req.index {
        Some(index) => Ok(state.meta_addresses.get_meta_address(&owner, index).await?),
        None => state
            .meta_addresses
            .get_latest_meta_address(&owner)
            .await?
            .ok_or_else(|| {
                ApiError::not_found(format!("No meta-address registered for {}", owner))
            }),
    }
}

/// POST /api/v1/stealth/create
pub async fn create_stealth(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<CreateStealthRequest>,
) -> Result<Json<CreateStealthResponse>> {
    let Json(req) = payload?;

    let target = resolve_target(&state, &req).await?;
    let amount = parse_amount(req.amount.as_deref())?.unwrap_or(0);
    let k = req.k.unwrap_or(state.engine.params().default_k);

    let payment = create_stealth_payment(&state.engine, &target, k, amount)?;

    let response = CreateStealthResponse {
        stealth_address: payment.stealth_address().to_checksum_string(),
        stealth_public_key: payment.derivation.stealth_public_key,
        ephemeral_public_key: payment.derivation.ephemeral_public_key,
        view_hint: payment.derivation.view_hint,
        k: payment.derivation.k,
        announcement: payment.announcement,
    };

    debug!(
        stealth_address = %response.stealth_address,
        view_hint = response.view_hint,
        "Created stealth payment"
    );

    Ok(Json(response))
}

/// POST /api/v1/stealth/scan
pub async fn scan_payments(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<ScanRequest>,
) -> Result<Json<ScanResponse>> {
    let Json(req) = payload?;

    let viewing_sk = SecpSecretKey::from_hex(&req.viewing_secret_key)?;
    let spend_pk = SecpPublicKey::from_hex(&req.spend_public_key)?;
    let spend_sk = req
        .spend_secret_key
        .as_deref()
        .map(SecpSecretKey::from_hex)
        .transpose()?;

    let registry = state.announcements.registry();
    let announcements = if let Some(hints) = &req.view_hints {
        let unique: BTreeSet<u8> = hints.iter().copied().collect();
        let mut all = Vec::new();
        for hint in unique {
            all.extend(registry.get_by_view_hint(hint).await?);
        }
        all
    } else if let Some(recipient) = &req.recipient {
        registry.get_by_recipient(recipient).await?
    } else if req.from_block.is_some() || req.to_block.is_some() {
        registry
            .get_by_block_range(req.from_block.unwrap_or(0), req.to_block.unwrap_or(u64::MAX))
            .await?
    } else {
        state.announcements.memory().all_announcements()
    };

    let (matches, stats) = state
        .engine
        .scan_with_stats(&viewing_sk, &spend_pk, &announcements)?;

    let mut payments = Vec::with_capacity(matches.len());
    for matched in matches {
        let stealth_private_key = match &spend_sk {
            Some(spend_sk) => Some(
                state
                    .engine
                    .recover_and_verify(
                        spend_sk,
                        &viewing_sk,
                        &matched.announcement.ephemeral_pub_key,
                        matched.k,
                        &matched.stealth_address,
                    )?
                    .to_hex(),
            ),
            None => None,
        };

        payments.push(DiscoveryDto {
            stealth_address: matched.stealth_address.to_checksum_string(),
            announcement_id: matched.announcement.id,
            k: matched.k,
            amount: matched.announcement.amount,
            block_number: matched.announcement.block_number,
            tx_hash: matched.announcement.tx_hash,
            stealth_private_key,
        });
    }

    info!(
        total_scanned = stats.total_scanned,
        matches = payments.len(),
        duration_ms = stats.duration_ms,
        "Scan complete"
    );

    Ok(Json(ScanResponse {
        payments,
        stats: ScanStatsDto::from(&stats),
    }))
}

/// POST /api/v1/stealth/recover
pub async fn recover_key(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<RecoverRequest>,
) -> Result<Json<RecoverResponse>> {
    let Json(req) = payload?;

    let spend_sk = SecpSecretKey::from_hex(&req.spend_secret_key)?;
    let viewing_sk = SecpSecretKey::from_hex(&req.viewing_secret_key)?;
    let ephemeral_pk = hex::decode(strip_hex_prefix(&req.ephemeral_public_key))?;

    let (key, verified) = match &req.stealth_address {
        Some(expected) => (
            state
                .engine
                .recover_and_verify(&spend_sk, &viewing_sk, &ephemeral_pk, req.k, expected)?,
            true,
        ),
        None => (
            state
                .engine
                .recover_stealth_private_key(&spend_sk, &viewing_sk, &ephemeral_pk, req.k)?,
            false,
        ),
    };
    let stealth_address = address_from_secret_key(&key)?;

    debug!(%stealth_address, verified, "Recovered stealth key");
    Ok(Json(RecoverResponse {
        stealth_address: stealth_address.to_checksum_string(),
        stealth_private_key: key.to_hex(),
        verified,
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// ANNOUNCEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// POST /api/v1/announcements
pub async fn publish_announcement(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<PaymentAnnouncement>,
) -> Result<Json<PublishAnnouncementResponse>> {
    let Json(announcement) = payload?;
    let view_hint = announcement.view_hint;

    let id = state.announcements.registry().publish(announcement).await?;

    info!(id, view_hint, "Published announcement");
    Ok(Json(PublishAnnouncementResponse { id }))
}

/// GET /api/v1/announcements
pub async fn list_announcements(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListAnnouncementsQuery>,
) -> Result<Json<ListAnnouncementsResponse>> {
    let registry = state.announcements.registry();

    let announcements = if let Some(hint) = params.view_hint {
        registry.get_by_view_hint(hint).await?
    } else if let Some(recipient) = &params.recipient {
        registry.get_by_recipient(recipient).await?
    } else if let (Some(from), Some(to)) = (params.from_block, params.to_block) {
        registry.get_by_block_range(from, to).await?
    } else if let (Some(from), Some(to)) = (params.from_timestamp, params.to_timestamp) {
        registry.get_by_time_range(from, to).await?
    } else {
        state.announcements.memory().all_announcements()
    };

    let total = announcements.len() as u64;

    let offset = params.offset.unwrap_or(0) as usize;
    let limit = params
        .limit
        .map_or(DEFAULT_PAGE_SIZE, |l| l as usize)
        .min(MAX_PAGE_SIZE);

    let page = announcements.into_iter().skip(offset).take(limit).collect();

    Ok(Json(ListAnnouncementsResponse {
        announcements: page,
        total,
    }))
}

/// GET /api/v1/announcements/stats
pub async fn get_registry_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RegistryStatsResponse>> {
    let stats = state.announcements.memory().stats();

    let distribution = stats
        .view_hint_distribution
        .iter()
        .enumerate()
        .filter(|(_, &count)| count > 0)
        .map(|(hint, &count)| ViewHintCount {
            hint: hint as u8,
            count,
        })
        .collect();

    Ok(Json(RegistryStatsResponse {
        total_announcements: stats.total_count,
        total_amount: stats.total_amount,
        latest_block: stats.latest_block,
        view_hint_distribution: distribution,
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// META-ADDRESSES & ALIASES
// ═══════════════════════════════════════════════════════════════════════════════

/// POST /api/v1/meta-addresses
pub async fn register_meta_address(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<RegisterMetaAddressRequest>,
) -> Result<Json<RegisterMetaAddressResponse>> {
    let Json(req) = payload?;
    let meta = MetaAddress::from_hex(&req.meta_address)?;

    let index = state
        .meta_addresses
        .register_meta_address(req.owner, meta)
        .await?;

    info!(owner = %req.owner, index, "Registered meta-address");
    Ok(Json(RegisterMetaAddressResponse {
        owner: req.owner,
        index,
    }))
}

/// GET /api/v1/meta-addresses/:owner
pub async fn list_meta_addresses(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
) -> Result<Json<MetaAddressListResponse>> {
    let owner = parse_address(&owner)?;
    let meta_addresses: Vec<MetaAddressDto> = state
        .meta_addresses
        .list(&owner)
        .into_iter()
        .map(MetaAddressDto::from)
        .collect();

    Ok(Json(MetaAddressListResponse {
        owner,
        count: meta_addresses.len() as u64,
        meta_addresses,
    }))
}

/// GET /api/v1/meta-addresses/:owner/:index
pub async fn get_meta_address(
    State(state): State<Arc<AppState>>,
    Path((owner, index)): Path<(String, u64)>,
) -> Result<Json<MetaAddressDto>> {
    let owner = parse_address(&owner)?;
    let registered = state.meta_addresses.get_meta_address(&owner, index).await?;
    Ok(Json(MetaAddressDto::from(registered)))
}

async fn alias_response(
    state: &AppState,
    alias: String,
    wallet: EthAddress,
) -> Result<AliasResponse> {
    let meta_address = state
        .meta_addresses
        .get_latest_meta_address(&wallet)
        .await?
        .map(MetaAddressDto::from);

    Ok(AliasResponse {
        alias,
        wallet,
        meta_address,
    })
}

/// POST /api/v1/aliases
pub async fn register_alias(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<RegisterAliasRequest>,
) -> Result<Json<AliasResponse>> {
    let Json(req) = payload?;
    let alias = validate_alias(&req.alias)?;

    state.aliases.register_alias(&alias, req.wallet).await?;

    info!(%alias, wallet = %req.wallet, "Registered alias");
    Ok(Json(alias_response(&state, alias, req.wallet).await?))
}

/// GET /api/v1/aliases/:alias
pub async fn resolve_alias(
    State(state): State<Arc<AppState>>,
    Path(alias): Path<String>,
) -> Result<Json<AliasResponse>> {
    let alias = validate_alias(&alias)?;
    let wallet = state
        .aliases
        .resolve_alias(&alias)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Alias not found: {}", alias)))?;

    Ok(Json(alias_response(&state, alias, wallet).await?))
}

// ═══════════════════════════════════════════════════════════════════════════════
// PAYMENT LINKS
// ═══════════════════════════════════════════════════════════════════════════════

/// POST /api/v1/links
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<CreateLinkRequest>,
) -> Result<Json<CreateLinkResponse>> {
    let Json(req) = payload?;
    let amount = parse_amount(req.amount.as_deref())?;
    let network = &state.config.network;

    let recipient =
        resolve_recipient(&state.aliases, &state.meta_addresses, &req.alias, None).await?;
    let link = PaymentLink::generate(
        &recipient.alias,
        recipient.wallet,
        &recipient.meta_address.meta_address,
        amount,
        req.message,
        network,
    )?;
    validate_payment_link(&link, network.chain_id)?;

    info!(
        alias = %link.alias,
        stealth_address = %link.stealth.stealth_address,
        "Created payment link"
    );
    Ok(Json(CreateLinkResponse {
        uri: link.uri.to_string(),
        shareable_text: link.shareable_text(),
        link,
    }))
}

/// POST /api/v1/links/parse
pub async fn parse_link(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<ParseLinkRequest>,
) -> Result<Json<ParseLinkResponse>> {
    let Json(req) = payload?;
    let parsed = parse_payment_link(&req.link)?;

    let recipient = match &parsed {
        ParsedPaymentLink::Link { alias, .. } => match state.aliases.resolve_alias(alias).await? {
            Some(wallet) => Some(alias_response(&state, alias.clone(), wallet).await?),
            None => None,
        },
        ParsedPaymentLink::Uri { .. } => None,
    };

    Ok(Json(ParseLinkResponse { parsed, recipient }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSACTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// POST /api/v1/transactions
pub async fn record_transaction(
    State(state): State<Arc<AppState>>,
    payload: JsonBody<CreateTransactionRequest>,
) -> Result<Json<TransactionRecord>> {
    let Json(req) = payload?;

    let mut record = TransactionRecord::pending(
        req.tx_type,
        req.sender,
        req.recipient,
        req.stealth_address,
        req.amount,
        req.tx_hash,
    );
    record.id = state.transactions.insert(record.clone()).await?;

    info!(id = record.id, tx_hash = %record.tx_hash, "Recorded transaction");
    Ok(Json(record))
}

/// POST /api/v1/transactions/:tx_hash/confirm
pub async fn confirm_transaction(
    State(state): State<Arc<AppState>>,
    Path(tx_hash): Path<String>,
    payload: Option<Json<ConfirmTransactionRequest>>,
) -> Result<Json<TransactionRecord>> {
    let tx_hash = TxHash::from_hex(&tx_hash)?;
    let block_number = payload.and_then(|Json(req)| req.block_number);

    let record = state
        .transactions
        .update_status(&tx_hash, TxStatus::Confirmed, block_number)
        .await?;

    info!(%tx_hash, block_number = ?record.block_number, "Confirmed transaction");
    Ok(Json(record))
}

/// GET /api/v1/transactions/address/:address
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<TransactionListResponse>> {
    let address = parse_address(&address)?;
    let transactions = state.transactions.list_for_address(&address).await?;

    Ok(Json(TransactionListResponse {
        address,
        transactions,
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEALTH
// ═══════════════════════════════════════════════════════════════════════════════

static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let start = START_TIME.get_or_init(Instant::now);
    let uptime = start.elapsed().as_secs();

    let count = state.announcements.registry().count().await.unwrap_or(0);

    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: uptime,
        announcements_count: count,
        network: state.config.network.network.to_string(),
        chain_id: state.config.network.chain_id,
    })
}
