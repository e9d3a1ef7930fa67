pub mod bridge;
pub mod domain;
pub mod events;
pub mod ports;
pub mod storage;
pub mod units;

pub use bridge::{
    ClientEvent, ClientEventKind, ConnectParams, DisconnectParams, DisconnectReason, InitParams,
    RequestParams, RpcRequest, USER_DISCONNECTED_CODE,
};
pub use domain::{
    account_id_from_chain_account, AccessKey, AccessKeyPermission, Account, AccountView, Action,
    AddKeyParams, AppMetadata, DeleteKeyParams, Finality, FunctionCallParams,
    FunctionCallPermission, Message, Network, Pairing, SelectorOptions, Session,
    SessionPermissions, SignAndSendTransactionParams, SignAndSendTransactionsParams, Transaction,
    TransferParams, WalletMetadata, WalletType, SIGN_AND_SEND_TRANSACTION,
    SIGN_AND_SEND_TRANSACTIONS,
};
pub use events::{AccountsChanged, EventEmitter, EventHandler, Subscription};
pub use ports::{BridgeClientPort, PortError, RpcProviderPort, StoragePort, Wallet};
pub use storage::JsonStorage;
pub use units::{format_near_amount, parse_near_amount, NEAR_NOMINATION_EXP};
