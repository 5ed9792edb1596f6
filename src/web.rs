pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Farm Sync</title>
<style>
*{box-sizing:border-box;margin:0;padding:0}
body{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;background:#0f1117;color:#e1e4e8;min-height:100vh;padding:16px}
h1{font-size:20px;margin-bottom:12px;color:#58a6ff}
h2{font-size:14px;font-weight:600;color:#8b949e;text-transform:uppercase;letter-spacing:1px;margin-bottom:8px}
.grid{display:grid;grid-template-columns:1fr 1fr;gap:12px;max-width:960px;margin:0 auto}
.full{grid-column:1/-1}
.card{background:#161b22;border:1px solid #30363d;border-radius:8px;padding:14px}
.balance{font-size:18px;font-weight:600;color:#3fb950}
input,select{background:#0d1117;border:1px solid #30363d;color:#e1e4e8;padding:6px 10px;border-radius:4px;font-size:13px}
label{font-size:12px;color:#8b949e;margin-right:4px}
.row{display:flex;gap:8px;align-items:center;margin:4px 0}
button{padding:6px 12px;border:none;border-radius:6px;font-size:13px;font-weight:600;cursor:pointer}
button:disabled{opacity:.4;cursor:not-allowed}
.btn-primary{background:#238636;color:#fff}
.btn-warn{background:#d29922;color:#000}
.plots{display:grid;grid-template-columns:repeat(auto-fill,minmax(120px,1fr));gap:8px}
.plot{border:1px solid #30363d;border-radius:6px;padding:8px;font-size:12px;min-height:80px}
.plot.empty{background:#0d1117}
.plot.growing{background:#1c2a1c}
.plot.ready{background:#2d4a1e;border-color:#3fb950}
.timer{font-family:'SF Mono',Monaco,Consolas,monospace;color:#d29922}
table{width:100%;font-size:13px;border-collapse:collapse}
td,th{padding:4px;border-bottom:1px solid #21262d;text-align:left}
.contract.expired{opacity:.5}
.contract.completed{color:#3fb950}
.events{max-height:220px;overflow-y:auto;font-size:12px;font-family:'SF Mono',Monaco,Consolas,monospace}
.ev{padding:3px 0;border-bottom:1px solid #21262d;display:flex;gap:8px}
.ev-ts{color:#484f58;min-width:55px}
.ev-kind{color:#58a6ff;min-width:60px;font-weight:600}
.ev-error .ev-kind{color:#da3633}
</style>
</head>
<body>
<div class="grid">

<div class="card full">
  <div style="display:flex;justify-content:space-between;align-items:center">
    <h1 id="farmName">Farm</h1>
    <span id="balance" class="balance"></span>
  </div>
  <div class="row">
    <label>Seed</label>
    <select id="seedSelect" onchange="selectSeed(this.value)"></select>
    <button class="btn-warn" onclick="reloadAll()">Reload</button>
  </div>
</div>

<div class="card full">
  <h2>Plots</h2>
  <div class="plots" id="plots"></div>
</div>

<div class="card">
  <h2>Inventory</h2>
  <table id="inventory"></table>
</div>

<div class="card">
  <h2>Post Listing</h2>
  <div class="row"><label>Crop</label><select id="lCrop"></select></div>
  <div class="row"><label>Qty</label><input id="lQty" type="number" min="1" value="1"></div>
  <div class="row"><label>Price</label><input id="lPrice" type="number" min="1" value="1"></div>
  <button class="btn-primary" onclick="createListing()">Post</button>
</div>

<div class="card">
  <h2>Market</h2>
  <table id="listings"></table>
</div>

<div class="card">
  <h2>Contracts <span id="boardTimer" class="timer"></span></h2>
  <table id="contracts"></table>
</div>

<div class="card full">
  <h2>Event Log</h2>
  <div class="events" id="eventLog"></div>
</div>

</div>

<script>
async function api(path, opts, fallback) {
  const r = await fetch(path, opts);
  const text = await r.text();
  if (!r.ok) {
    alert(text || fallback || r.statusText);
    throw new Error(text);
  }
  try { return JSON.parse(text); } catch { return {}; }
}

function post(path, body, fallback) {
  const opts = {method: 'POST', headers: {'Content-Type': 'application/json'}, body: JSON.stringify(body || {})};
  return api(path, opts, fallback).then(refreshView).catch(() => {});
}

function esc(s) {
  return String(s ?? '').replace(/[&<>"]/g, c => ({'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;'}[c]));
}

const selectSeed = id => post('/api/seed', {seed_id: id || null});
const plant = id => post(`/api/plots/${id}/plant`, {}, 'Error planting');
const harvest = id => post(`/api/plots/${id}/harvest`, {}, 'Error harvesting');
const buy = id => post(`/api/market/listings/${id}/buy`, {}, 'Error buying listing');
const complete = id => post(`/api/contracts/${id}/complete`, {}, 'Error completing contract');
const reloadAll = () => post('/api/reload', {}, 'Error reloading');

function setSellQty(cropId, value) {
  return post(`/api/inventory/${cropId}/sell-qty`, {quantity: parseInt(value, 10) || 0});
}

function sell(cropId) {
  const input = document.getElementById(`sellQty-${cropId}`);
  const quantity = parseInt(input ? input.value : '', 10);
  if (!Number.isInteger(quantity) || quantity <= 0) { alert('Enter a positive quantity'); return; }
  post(`/api/inventory/${cropId}/sell`, {quantity}, 'Error selling');
}

function createListing() {
  const crop = parseInt(document.getElementById('lCrop').value, 10);
  const quantity = parseInt(document.getElementById('lQty').value, 10);
  const price = parseInt(document.getElementById('lPrice').value, 10);
  post('/api/market/listings', {
    crop_type_id: Number.isInteger(crop) ? crop : null,
    quantity: Number.isInteger(quantity) ? quantity : null,
    unit_price: Number.isInteger(price) ? price : null,
  }, 'Error creating listing');
}

function renderPlot(p) {
  let body = `<div><b>#${p.id}</b> ${esc(p.crop_name || '')}</div>`;
  if (p.timer_label) body += `<div class="timer">${esc(p.timer_label)}</div>`;
  if (p.show_plant) body += `<button class="btn-primary" onclick="plant(${p.id})">Plant</button>`;
  if (p.show_harvest) body += `<button class="btn-warn" onclick="harvest(${p.id})">Harvest</button>`;
  return `<div class="plot ${p.state}" id="plot-${p.id}">${body}</div>`;
}

function renderView(v) {
  document.getElementById('farmName').textContent = v.farm_name || 'Farm';
  document.getElementById('balance').textContent = v.balance_text;

  const seedSel = document.getElementById('seedSelect');
  if (document.activeElement !== seedSel) {
    seedSel.innerHTML = '<option value="">-- seed --</option>' + v.seeds.map(s =>
      `<option value="${esc(s.id)}" ${s.selected ? 'selected' : ''}>${esc(s.name)} (${s.seed_price}c, ${s.grow_time_seconds}s)</option>`).join('');
  }

  document.getElementById('plots').innerHTML = v.plots.map(renderPlot).join('');

  const inv = document.getElementById('inventory');
  if (!inv.contains(document.activeElement)) {
    inv.innerHTML = '<tr><th>Crop</th><th>Qty</th><th>Price</th><th>Sell</th><th></th></tr>' + v.inventory.map(l =>
      `<tr><td>${esc(l.name)}</td><td>${l.quantity}</td><td>${l.base_price}</td>
       <td><input id="sellQty-${l.crop_id}" type="number" min="1" max="${l.quantity}" value="${l.sell_quantity}"
            style="width:64px" onchange="setSellQty(${l.crop_id}, this.value)"></td>
       <td><button class="btn-primary" onclick="sell(${l.crop_id})">Sell (${l.sell_value})</button></td></tr>`).join('');
  }

  const lCrop = document.getElementById('lCrop');
  if (document.activeElement !== lCrop) {
    const current = lCrop.value;
    lCrop.innerHTML = '<option value="">--</option>' + v.inventory.map(l =>
      `<option value="${l.crop_id}" ${String(l.crop_id) === current ? 'selected' : ''}>${esc(l.name)} (${l.quantity})</option>`).join('');
  }

  document.getElementById('listings').innerHTML = '<tr><th>Seller</th><th>Crop</th><th>Qty</th><th>Each</th><th></th></tr>' +
    v.listings.map(l => `<tr><td>${esc(l.seller_name)}</td><td>${esc(l.crop_name)}</td><td>${l.quantity}</td>
      <td>${l.unit_price}</td><td><button class="btn-primary" onclick="buy(${l.id})">Buy (${l.total})</button></td></tr>`).join('');

  document.getElementById('boardTimer').textContent = v.board_label || '';
  document.getElementById('contracts').innerHTML = '<tr><th>Need</th><th>Reward</th><th>Time</th><th></th></tr>' +
    v.contracts.map(c => `<tr class="contract ${c.state}"><td>${c.quantity_required} ${esc(c.crop_name)}</td>
      <td>${c.reward_coins}${c.unlocks_crop ? ' + ' + esc(c.unlocks_crop) : ''}</td>
      <td class="timer">${esc(c.timer_label)}</td>
      <td><button class="btn-primary" onclick="complete(${c.id})" ${c.can_complete ? '' : 'disabled'}>${c.busy ? '...' : 'Complete'}</button></td></tr>`).join('');
}

async function refreshView() {
  try {
    const r = await fetch('/api/view');
    if (r.ok) renderView(await r.json());
  } catch {}
}

async function pollEvents() {
  try {
    const r = await fetch('/api/events');
    if (!r.ok) return;
    const events = await r.json();
    document.getElementById('eventLog').innerHTML = events.slice().reverse().map(e =>
      `<div class="ev ev-${esc(e.kind)}"><span class="ev-ts">${esc(e.ts)}</span><span class="ev-kind">${esc(e.kind)}</span><span>${esc(e.detail)}</span></div>`).join('');
  } catch {}
}

refreshView();
pollEvents();
setInterval(() => { refreshView(); pollEvents(); }, 1000);
</script>
</body>
</html>
"##;
