//! Action draft builders
//!
//! Assembles the account-creation bundle and generic single-action drafts,
//! validating names, asset quantities and payload hex before anything is
//! broadcast. Validation failures surface in-band for the affected
//! position; nothing is submitted for a draft that fails to build.

use serde_json::json;

use crate::config::SponsorConfig;
use crate::error::{RelayError, Result};
use crate::ledger::asset::Asset;
use crate::ledger::name;
use crate::ledger::{ActionData, ActionDraft, PermissionLevel};

/// System contract hosting account and resource actions.
pub const SYSTEM_ACCOUNT: &str = "eosio";
/// Core token contract used for the welcome transfer.
pub const TOKEN_ACCOUNT: &str = "eosio.token";
/// Permission the relay acts under, for both the sponsor and callers.
pub const ACTIVE_PERMISSION: &str = "active";

/// Inputs for either account-creation branch.
#[derive(Debug, Clone)]
pub struct CreateAccountParams<'a> {
    pub new_account_name: &'a str,
    pub stake_net_quantity: &'a str,
    pub stake_cpu_quantity: &'a str,
    /// Welcome transfer quantity; `None` leaves the transfer action out.
    pub transfer_quantity: Option<&'a str>,
}

fn sponsor_auth(sponsor: &SponsorConfig) -> Vec<PermissionLevel> {
    vec![PermissionLevel {
        actor: sponsor.creator.clone(),
        permission: ACTIVE_PERMISSION.to_string(),
    }]
}

/// Owner/active authority wrapping a single key.
fn key_authority(public_key: &str) -> serde_json::Value {
    json!({
        "threshold": 1,
        "keys": [{ "key": public_key, "weight": 1 }],
        "accounts": [],
        "waits": [],
    })
}

fn parse_quantity(label: &str, value: &str) -> Result<Asset> {
    value
        .parse::<Asset>()
        .map_err(|e| RelayError::InvalidAsset(format!("{}: {}", label, e)))
}

/// Build the bundle for one new account: `newaccount`, `buyrambytes`,
/// `delegatebw` and, when a quantity is given, the welcome `transfer`.
/// All four actions ride in a single transaction under the sponsor's
/// active permission.
pub fn create_account_bundle(
    sponsor: &SponsorConfig,
    params: &CreateAccountParams,
    owner_key: &str,
) -> Result<Vec<ActionDraft>> {
    name::validate_new_account(params.new_account_name)?;
    let stake_net = parse_quantity("stakeNetQuantity", params.stake_net_quantity)?;
    let stake_cpu = parse_quantity("stakeCpuQuantity", params.stake_cpu_quantity)?;

    let authority = key_authority(owner_key);
    let mut bundle = vec![
        ActionDraft {
            account: SYSTEM_ACCOUNT.to_string(),
            name: "newaccount".to_string(),
            authorization: sponsor_auth(sponsor),
            data: ActionData::Json(json!({
                "creator": sponsor.creator,
                "name": params.new_account_name,
                "owner": authority,
                "active": authority,
            })),
        },
        ActionDraft {
            account: SYSTEM_ACCOUNT.to_string(),
            name: "buyrambytes".to_string(),
            authorization: sponsor_auth(sponsor),
            data: ActionData::Json(json!({
                "payer": sponsor.creator,
                "receiver": params.new_account_name,
                "bytes": sponsor.ram_bytes,
            })),
        },
        ActionDraft {
            account: SYSTEM_ACCOUNT.to_string(),
            name: "delegatebw".to_string(),
            authorization: sponsor_auth(sponsor),
            data: ActionData::Json(json!({
                "from": sponsor.creator,
                "receiver": params.new_account_name,
                "stake_net_quantity": stake_net.to_string(),
                "stake_cpu_quantity": stake_cpu.to_string(),
                "transfer": 0,
            })),
        },
    ];

    if let Some(quantity) = params.transfer_quantity {
        let quantity = parse_quantity("transferEOSAmount", quantity)?;
        bundle.push(ActionDraft {
            account: TOKEN_ACCOUNT.to_string(),
            name: "transfer".to_string(),
            authorization: sponsor_auth(sponsor),
            data: ActionData::Json(json!({
                "from": sponsor.creator,
                "to": params.new_account_name,
                "quantity": quantity.to_string(),
                "memo": sponsor.welcome_memo,
            })),
        });
    }

    Ok(bundle)
}

/// Build one generic action draft: caller-named contract/action/actor with
/// the permission fixed to `active` and the payload taken as raw hex.
pub fn single_action(account: &str, action_name: &str, actor: &str, bin_args: &str) -> Result<ActionDraft> {
    name::name_to_u64(account)
        .map_err(|e| RelayError::InvalidInput(format!("account: {}", e)))?;
    name::name_to_u64(action_name)
        .map_err(|e| RelayError::InvalidInput(format!("actionName: {}", e)))?;
    name::name_to_u64(actor).map_err(|e| RelayError::InvalidInput(format!("actor: {}", e)))?;

    let data = hex::decode(bin_args)
        .map_err(|e| RelayError::InvalidInput(format!("binArgs is not hex: {}", e)))?;

    Ok(ActionDraft {
        account: account.to_string(),
        name: action_name.to_string(),
        authorization: vec![PermissionLevel {
            actor: actor.to_string(),
            permission: ACTIVE_PERMISSION.to_string(),
        }],
        data: ActionData::Raw(data),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SponsorConfig;

    fn sponsor() -> SponsorConfig {
        SponsorConfig::default()
    }

    fn params<'a>(transfer: Option<&'a str>) -> CreateAccountParams<'a> {
        CreateAccountParams {
            new_account_name: "alice",
            stake_net_quantity: "1.0000 EOS",
            stake_cpu_quantity: "1.0000 EOS",
            transfer_quantity: transfer,
        }
    }

    #[test]
    fn test_bundle_with_transfer() {
        let bundle = create_account_bundle(&sponsor(), &params(Some("5.0000 EOS")), "EOSkey").unwrap();
        let names: Vec<&str> = bundle.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["newaccount", "buyrambytes", "delegatebw", "transfer"]);

        // every action is authorized by the sponsor's active permission
        for action in &bundle {
            assert_eq!(action.authorization.len(), 1);
            assert_eq!(action.authorization[0].actor, "cptblackbill");
            assert_eq!(action.authorization[0].permission, "active");
        }

        let transfer = &bundle[3];
        assert_eq!(transfer.account, TOKEN_ACCOUNT);
        match &transfer.data {
            ActionData::Json(args) => {
                assert_eq!(args["from"], "cptblackbill");
                assert_eq!(args["to"], "alice");
                assert_eq!(args["quantity"], "5.0000 EOS");
                assert_eq!(args["memo"], "Welcome to Cpt.BlackBill.");
            }
            ActionData::Raw(_) => panic!("transfer args must be JSON"),
        }
    }

    #[test]
    fn test_bundle_without_transfer() {
        let bundle = create_account_bundle(&sponsor(), &params(None), "EOSkey").unwrap();
        let names: Vec<&str> = bundle.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["newaccount", "buyrambytes", "delegatebw"]);
    }

    #[test]
    fn test_newaccount_authority_shape() {
        let bundle = create_account_bundle(&sponsor(), &params(None), "EOSsomekey").unwrap();
        match &bundle[0].data {
            ActionData::Json(args) => {
                assert_eq!(args["creator"], "cptblackbill");
                assert_eq!(args["owner"]["threshold"], 1);
                assert_eq!(args["owner"]["keys"][0]["key"], "EOSsomekey");
                assert_eq!(args["owner"]["keys"][0]["weight"], 1);
                assert_eq!(args["owner"], args["active"]);
            }
            ActionData::Raw(_) => panic!("newaccount args must be JSON"),
        }
    }

    #[test]
    fn test_bundle_rejects_bad_inputs() {
        let sponsor = sponsor();
        let mut bad_name = params(None);
        bad_name.new_account_name = "NotValid";
        assert!(matches!(
            create_account_bundle(&sponsor, &bad_name, "EOSkey"),
            Err(RelayError::InvalidName(_))
        ));

        let mut bad_stake = params(None);
        bad_stake.stake_net_quantity = "lots of EOS";
        assert!(matches!(
            create_account_bundle(&sponsor, &bad_stake, "EOSkey"),
            Err(RelayError::InvalidAsset(_))
        ));
    }

    #[test]
    fn test_single_action() {
        let draft = single_action("mycontract", "dosomething", "someactor", "deadbeef").unwrap();
        assert_eq!(draft.account, "mycontract");
        assert_eq!(draft.name, "dosomething");
        assert_eq!(draft.authorization[0].actor, "someactor");
        assert_eq!(draft.authorization[0].permission, "active");
        match &draft.data {
            ActionData::Raw(bytes) => assert_eq!(bytes, &[0xde, 0xad, 0xbe, 0xef]),
            ActionData::Json(_) => panic!("generic payload must be raw"),
        }
    }

    #[test]
    fn test_single_action_rejects_bad_hex_and_names() {
        assert!(single_action("mycontract", "dosomething", "someactor", "nothex!").is_err());
        assert!(single_action("BadContract", "dosomething", "someactor", "").is_err());
        assert!(single_action("mycontract", "dosomething", "", "00").is_err());
    }
}
