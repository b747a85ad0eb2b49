use crate::error::{SubregError, SubregResult};
use crate::models::{Autorenew, Contact, DnsRecord, SubregEnvironment};
use crate::parser::{SoapNode, normalize, unwrap_envelope};
use crate::transport::{HttpTransport, Transport};
use serde_json::{Map, Value, json};

/// The fixed Google Workspace MX set, in the order it is installed
const GOOGLE_MX_RECORDS: [(&str, u32); 5] = [
    ("ASPMX.L.GOOGLE.COM.", 1),
    ("ALT1.ASPMX.L.GOOGLE.COM.", 5),
    ("ALT2.ASPMX.L.GOOGLE.COM.", 5),
    ("ASPMX2.GOOGLEMAIL.COM.", 10),
    ("ASPMX3.GOOGLEMAIL.COM.", 10),
];

/// Subreg API client.
///
/// Holds the session token issued by `Login` and replays it on every
/// subsequent command. The token is never cleared; a new login
/// overwrites it. Not safe for concurrent use from multiple tasks
/// against one instance: the token and last-response fields are
/// mutated in place.
pub struct SubregClient<T: Transport = HttpTransport> {
    transport: T,
    token: Option<String>,
    /// Last normalized envelope
    last_response: Option<Value>,
    /// Last decoded tree as received from the transport
    last_raw: Option<SoapNode>,
}

impl SubregClient<HttpTransport> {
    /// Create an anonymous client for the given environment
    pub fn new(environment: SubregEnvironment) -> Self {
        Self::with_transport(HttpTransport::new(environment))
    }

    /// Create an anonymous client against a custom endpoint URL
    pub fn with_url(endpoint: String) -> Self {
        Self::with_transport(HttpTransport::with_url(endpoint))
    }

    /// Create a client and log in immediately.
    ///
    /// Fails with the server's error envelope when the credentials are
    /// rejected.
    pub async fn with_credentials(
        environment: SubregEnvironment,
        username: &str,
        password: &str,
    ) -> SubregResult<Self> {
        let mut client = Self::new(environment);
        client.login(username, password).await?;
        Ok(client)
    }
}

impl<T: Transport> SubregClient<T> {
    /// Create a client over any transport implementation
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            token: None,
            last_response: None,
            last_raw: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Session token from the last successful login, if any
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Last normalized response envelope
    pub fn last_response(&self) -> Option<&Value> {
        self.last_response.as_ref()
    }

    /// Last raw decoded response from the transport
    pub fn last_raw(&self) -> Option<&SoapNode> {
        self.last_raw.as_ref()
    }

    /// Dispatch one command and unwrap its envelope.
    ///
    /// The session token, when held, is injected into the parameter
    /// mapping under `ssid` before dispatch. One round trip, no
    /// retries. An `error` envelope becomes [`SubregError::Api`]; an
    /// empty envelope becomes [`SubregError::Fatal`]; otherwise the
    /// `data` payload is returned.
    pub async fn invoke(
        &mut self,
        command: &str,
        mut params: Map<String, Value>,
    ) -> SubregResult<Value> {
        if let Some(token) = &self.token {
            params.insert("ssid".to_string(), Value::String(token.clone()));
        }
        let raw = self.transport.call(command, &params).await?;
        let envelope = normalize(&raw);
        self.last_raw = Some(raw);
        self.last_response = Some(envelope.clone());
        unwrap_envelope(&envelope)
    }

    /// Command `Login`: authenticate and store the session token.
    ///
    /// https://soap.subreg.cz/manual/?cmd=Login
    pub async fn login(&mut self, username: &str, password: &str) -> SubregResult<()> {
        let data = self
            .invoke("Login", bundle(json!({"login": username, "password": password})))
            .await?;
        let ssid = data
            .get("ssid")
            .and_then(Value::as_str)
            .ok_or_else(|| SubregError::Parse("Login response missing `ssid`".to_string()))?;
        self.token = Some(ssid.to_string());
        tracing::info!("Logged in to subreg as {}", username);
        Ok(())
    }

    /// Command `Check_Domain`: true iff the domain is available.
    ///
    /// https://soap.subreg.cz/manual/?cmd=Check_Domain
    pub async fn check_domain_available(&mut self, domain: &str) -> SubregResult<bool> {
        let data = self
            .invoke("Check_Domain", bundle(json!({"domain": domain})))
            .await?;
        Ok(data.get("avail").and_then(Value::as_i64) == Some(1))
    }

    /// Command `Info_Domain`: full info payload for one domain.
    ///
    /// https://soap.subreg.cz/manual/?cmd=Info_Domain
    pub async fn get_domain_info(&mut self, domain: &str) -> SubregResult<Value> {
        self.invoke("Info_Domain", bundle(json!({"domain": domain})))
            .await
    }

    /// Command `Info_Domain_CZ`: info payload for a single .CZ domain.
    ///
    /// https://soap.subreg.cz/manual/?cmd=Info_Domain_CZ
    pub async fn get_domain_info_cz(&mut self, domain: &str) -> SubregResult<Value> {
        self.invoke("Info_Domain_CZ", bundle(json!({"domain": domain})))
            .await
    }

    /// Command `Domains_List`: all domains on the account
    /// (`domains` list plus `count`).
    ///
    /// https://soap.subreg.cz/manual/?cmd=Domains_List
    pub async fn list_domains(&mut self) -> SubregResult<Value> {
        self.invoke("Domains_List", Map::new()).await
    }

    /// Command `Set_Autorenew`: set the renewal policy for a domain.
    ///
    /// `policy` must be one of `EXPIRE`, `AUTORENEW`, `RENEWONCE`;
    /// anything else short-circuits to `false` without a remote call.
    /// A remote error also degrades to `false`.
    ///
    /// https://soap.subreg.cz/manual/?cmd=Set_Autorenew
    pub async fn set_autorenew(&mut self, domain: &str, policy: &str) -> SubregResult<bool> {
        let Some(policy) = Autorenew::from_policy(policy) else {
            return Ok(false);
        };
        let result = self
            .invoke(
                "Set_Autorenew",
                bundle(json!({"domain": domain, "autorenew": policy.as_str()})),
            )
            .await;
        swallow_api(result)
    }

    /// Command `Get_Credit`: current account credit.
    ///
    /// https://soap.subreg.cz/manual/?cmd=Get_Credit
    pub async fn get_credit(&mut self) -> SubregResult<Value> {
        self.invoke("Get_Credit", Map::new()).await
    }

    /// Command `Pricelist`: the account pricelist.
    ///
    /// https://soap.subreg.cz/manual/?cmd=Pricelist
    pub async fn get_pricelist(&mut self) -> SubregResult<Value> {
        self.invoke("Pricelist", Map::new()).await
    }

    /// Command `List_Documents`: documents uploaded or generated on
    /// the account.
    ///
    /// https://soap.subreg.cz/manual/?cmd=List_Documents
    pub async fn list_documents(&mut self) -> SubregResult<Value> {
        self.invoke("List_Documents", Map::new()).await
    }

    /// Command `Users_List`: all sub-users of the account.
    ///
    /// https://soap.subreg.cz/manual/?cmd=Users_List
    pub async fn list_users(&mut self) -> SubregResult<Value> {
        self.invoke("Users_List", Map::new()).await
    }

    /// Command `Contacts_List`: all contacts on the account.
    ///
    /// https://soap.subreg.cz/manual/?cmd=Contacts_List
    pub async fn list_contacts(&mut self) -> SubregResult<Value> {
        self.invoke("Contacts_List", Map::new()).await
    }

    /// Command `Get_DNS_Zone`: all DNS records of one domain.
    ///
    /// A payload without a `records` field yields an empty zone.
    ///
    /// https://soap.subreg.cz/manual/?cmd=Get_DNS_Zone
    pub async fn get_dns_zone(&mut self, domain: &str) -> SubregResult<Vec<DnsRecord>> {
        let data = self
            .invoke("Get_DNS_Zone", bundle(json!({"domain": domain})))
            .await?;
        match data.get("records") {
            Some(records) => Ok(serde_json::from_value(records.clone())?),
            None => Ok(Vec::new()),
        }
    }

    /// Command `Add_DNS_Zone`: put a domain into DNS, optionally from
    /// a previously created template.
    ///
    /// Only the unset marker goes out on the wire; a caller-supplied
    /// template name is never transmitted. A remote error degrades to
    /// `false`.
    ///
    /// https://soap.subreg.cz/manual/?cmd=Add_DNS_Zone
    pub async fn add_dns_zone(&mut self, domain: &str, template: Option<&str>) -> SubregResult<bool> {
        let mut params = bundle(json!({"domain": domain}));
        if template.is_none() {
            params.insert("template".to_string(), Value::Null);
        }
        let result = self.invoke("Add_DNS_Zone", params).await;
        swallow_api(result)
    }

    /// Command `Delete_DNS_Zone`: remove ALL DNS records of a domain.
    ///
    /// Returns the deletion payload rather than a boolean.
    ///
    /// https://soap.subreg.cz/manual/?cmd=Delete_DNS_Zone
    pub async fn delete_dns_zone(&mut self, domain: &str) -> SubregResult<Value> {
        self.invoke("Delete_DNS_Zone", bundle(json!({"domain": domain})))
            .await
    }

    /// Command `Add_DNS_Record`: add one record to a zone.
    ///
    /// A single trailing `.` is stripped from `content` before
    /// sending. Returns the new record id; a remote error or a reply
    /// without `record_id` yields `None`.
    ///
    /// https://soap.subreg.cz/manual/?cmd=Add_DNS_Record
    pub async fn add_dns_record(
        &mut self,
        domain: &str,
        record: &DnsRecord,
    ) -> SubregResult<Option<u64>> {
        let mut record = record.clone();
        if let Some(stripped) = record.content.strip_suffix('.') {
            record.content = stripped.to_string();
        }
        let result = self
            .invoke(
                "Add_DNS_Record",
                bundle(json!({"domain": domain, "record": record})),
            )
            .await;
        match result {
            Ok(data) => Ok(data.get("record_id").and_then(Value::as_u64)),
            Err(SubregError::Api { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Command `Modify_DNS_Record`: change an existing record.
    ///
    /// `record.id` must be present and nonzero. A remote error
    /// degrades to `false`.
    ///
    /// https://soap.subreg.cz/manual/?cmd=Modify_DNS_Record
    pub async fn modify_dns_record(
        &mut self,
        domain: &str,
        record: &DnsRecord,
    ) -> SubregResult<bool> {
        if !matches!(record.id, Some(id) if id != 0) {
            return Err(SubregError::InvalidArgument(
                "You must specify `record.id` when editing a record".to_string(),
            ));
        }
        let result = self
            .invoke(
                "Modify_DNS_Record",
                bundle(json!({"domain": domain, "record": record})),
            )
            .await;
        swallow_api(result)
    }

    /// Command `Delete_DNS_Record`: remove one record from a zone.
    ///
    /// A zero `record_id` is rejected before any remote call. A remote
    /// error degrades to `false`.
    ///
    /// https://soap.subreg.cz/manual/?cmd=Delete_DNS_Record
    pub async fn delete_dns_record(&mut self, domain: &str, record_id: u64) -> SubregResult<bool> {
        if record_id == 0 {
            return Err(SubregError::InvalidArgument(
                "`record_id` must be a nonzero record id".to_string(),
            ));
        }
        let result = self
            .invoke(
                "Delete_DNS_Record",
                bundle(json!({"domain": domain, "record": {"id": record_id}})),
            )
            .await;
        swallow_api(result)
    }

    /// Command `POLL_Get`: read the next queued notification message.
    ///
    /// https://soap.subreg.cz/manual/?cmd=POLL_Get
    pub async fn poll_get(&mut self) -> SubregResult<Value> {
        self.invoke("POLL_Get", Map::new()).await
    }

    /// Replace every MX record of a domain with the fixed Google set.
    ///
    /// Two phases: one delete per existing MX record, then five adds
    /// with priorities 1/5/5/10/10 and TTL 3600, in that order. Not
    /// atomic: a failure mid-sequence leaves the zone partially
    /// updated.
    pub async fn set_google_mx_records(&mut self, domain: &str) -> SubregResult<()> {
        tracing::info!("Replacing MX records for {} with the Google set", domain);
        let records = self.get_dns_zone(domain).await?;
        for record in records {
            if record.record_type == "MX" {
                let id = record.id.ok_or_else(|| {
                    SubregError::InvalidArgument(format!(
                        "zone for {} returned an MX record without an id",
                        domain
                    ))
                })?;
                self.delete_dns_record(domain, id).await?;
            }
        }
        for (content, prio) in GOOGLE_MX_RECORDS {
            let record = DnsRecord {
                record_type: "MX".to_string(),
                content: content.to_string(),
                prio: Some(prio),
                ttl: Some(3600),
                ..DnsRecord::default()
            };
            self.add_dns_record(domain, &record).await?;
        }
        Ok(())
    }

    // The remaining catalog is declared but has no binding yet. Each
    // of these fails immediately and performs no remote call.

    /// Command `Create_Contact`: unimplemented.
    pub async fn create_contact(&mut self, _contact: &Contact) -> SubregResult<Value> {
        Err(SubregError::NotImplemented("Create_Contact"))
    }

    /// Command `Update_Contact`: unimplemented.
    pub async fn update_contact(&mut self, _contact: &Contact) -> SubregResult<Value> {
        Err(SubregError::NotImplemented("Update_Contact"))
    }

    /// Command `Info_Contact`: unimplemented.
    pub async fn info_contact(&mut self, _contact_id: &str) -> SubregResult<Value> {
        Err(SubregError::NotImplemented("Info_Contact"))
    }

    /// Command `Check_Object` (CZ/EE registries only): unimplemented.
    pub async fn check_object(&mut self, _id: &str, _object: &str) -> SubregResult<Value> {
        Err(SubregError::NotImplemented("Check_Object"))
    }

    /// Command `Info_Object` (CZ/EE registries only): unimplemented.
    pub async fn info_object(&mut self, _id: &str, _object: &str) -> SubregResult<Value> {
        Err(SubregError::NotImplemented("Info_Object"))
    }

    /// Command `Make_Order` (create/transfer/renew/delete domain,
    /// host and object management): unimplemented.
    pub async fn make_order(&mut self, _order: Value) -> SubregResult<Value> {
        Err(SubregError::NotImplemented("Make_Order"))
    }

    /// Command `Info_Order`: unimplemented.
    pub async fn info_order(&mut self, _order_id: u64) -> SubregResult<Value> {
        Err(SubregError::NotImplemented("Info_Order"))
    }

    /// Command `Get_Accountings`: unimplemented.
    pub async fn get_accountings(&mut self, _from_date: &str, _to_date: &str) -> SubregResult<Value> {
        Err(SubregError::NotImplemented("Get_Accountings"))
    }

    /// Command `Client_Payment`: unimplemented.
    pub async fn client_payment(
        &mut self,
        _username: &str,
        _amount: f64,
        _currency: &str,
    ) -> SubregResult<Value> {
        Err(SubregError::NotImplemented("Client_Payment"))
    }

    /// Command `Credit_Correction`: unimplemented.
    pub async fn credit_correction(
        &mut self,
        _username: &str,
        _amount: f64,
        _reason: &str,
    ) -> SubregResult<Value> {
        Err(SubregError::NotImplemented("Credit_Correction"))
    }

    /// Command `Prices`: unimplemented.
    pub async fn prices(&mut self, _tld: &str) -> SubregResult<Value> {
        Err(SubregError::NotImplemented("Prices"))
    }

    /// Command `Get_Pricelist` (download one named pricelist):
    /// unimplemented.
    pub async fn get_named_pricelist(&mut self, _pricelist: &str) -> SubregResult<Value> {
        Err(SubregError::NotImplemented("Get_Pricelist"))
    }

    /// Command `Set_Prices`: unimplemented.
    pub async fn set_prices(
        &mut self,
        _pricelist: &str,
        _tld: &str,
        _currency: &str,
        _prices: Option<Value>,
    ) -> SubregResult<Value> {
        Err(SubregError::NotImplemented("Set_Prices"))
    }

    /// Command `Download_Document`: unimplemented.
    pub async fn download_document(&mut self, _document_id: u64) -> SubregResult<Value> {
        Err(SubregError::NotImplemented("Download_Document"))
    }

    /// Command `Upload_Document`: unimplemented.
    pub async fn upload_document(
        &mut self,
        _name: &str,
        _document: &str,
        _doc_type: Option<&str>,
        _filetype: Option<&str>,
    ) -> SubregResult<Value> {
        Err(SubregError::NotImplemented("Upload_Document"))
    }

    /// Command `Set_DNS_Zone` (replace a whole zone at once):
    /// unimplemented.
    pub async fn set_dns_zone(
        &mut self,
        _domain: &str,
        _records: &[DnsRecord],
    ) -> SubregResult<Value> {
        Err(SubregError::NotImplemented("Set_DNS_Zone"))
    }

    /// Command `POLL_Ack`: unimplemented.
    pub async fn poll_ack(&mut self, _poll_id: u64) -> SubregResult<Value> {
        Err(SubregError::NotImplemented("POLL_Ack"))
    }

    /// Command `OIB_Search` (Croatian OIB registry lookup):
    /// unimplemented.
    pub async fn oib_search(&mut self, _oib: &str) -> SubregResult<Value> {
        Err(SubregError::NotImplemented("OIB_Search"))
    }
}

/// Pass only envelope errors through as `false`; everything else
/// propagates.
fn swallow_api(result: SubregResult<Value>) -> SubregResult<bool> {
    match result {
        Ok(_) => Ok(true),
        Err(SubregError::Api { .. }) => Ok(false),
        Err(err) => Err(err),
    }
}

fn bundle(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
